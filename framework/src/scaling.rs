//! Fixed linear scaling from raw sensor codes to physical values
//!
//! Inertial values are carried as ×100 fixed-point `i16` so they fit a
//! compact wire field. Downstream consumers divide by [`FIXED_POINT_SCALE`].

/// Full-scale code of the 12-bit ADC
pub const ADC_FULL_SCALE: f32 = 4095.0;

/// ADC reference voltage (volts)
pub const ADC_REFERENCE_VOLTS: f32 = 3.3;

/// Accelerometer counts per g (±2g range)
pub const ACCEL_SCALE: f32 = 16384.0;

/// Gyroscope counts per deg/s (±250 deg/s range)
pub const GYRO_SCALE: f32 = 131.0;

/// Multiplier of the fixed-point encoding
pub const FIXED_POINT_SCALE: f32 = 100.0;

// Temperature math runs in f64, the datasheet offset is not exact in f32
const TEMP_COUNTS_PER_DEG: f64 = 340.0;
const TEMP_OFFSET_DEG: f64 = 36.53;

/// Convert a raw 12-bit ADC code to volts: `(code / 4095) * 3.3`
#[inline]
pub fn adc_to_voltage(code: u16) -> f32 {
    (code as f32 / ADC_FULL_SCALE) * ADC_REFERENCE_VOLTS
}

/// Truncate toward zero into the signed 16-bit range
///
/// Out-of-range values saturate at `i16::MIN`/`i16::MAX` (Rust float casts
/// saturate, NaN becomes 0).
#[inline]
pub fn truncate_i16(value: f32) -> i16 {
    value as i16
}

/// Raw accelerometer counts to g×100
#[inline]
pub fn scale_accel(counts: i16) -> i16 {
    truncate_i16((counts as f32 / ACCEL_SCALE) * FIXED_POINT_SCALE)
}

/// Raw gyroscope counts to (deg/s)×100
#[inline]
pub fn scale_gyro(counts: i16) -> i16 {
    truncate_i16((counts as f32 / GYRO_SCALE) * FIXED_POINT_SCALE)
}

/// Raw temperature counts to °C×100: `(raw / 340 + 36.53) * 100`
#[inline]
pub fn scale_temperature(counts: i16) -> i16 {
    let celsius = counts as f64 / TEMP_COUNTS_PER_DEG + TEMP_OFFSET_DEG;
    truncate_i16((celsius * FIXED_POINT_SCALE as f64) as f32)
}

/// Recover the physical value of a ×100 fixed-point field
#[inline]
pub fn fixed_to_physical(value: i16) -> f32 {
    value as f32 / FIXED_POINT_SCALE
}
