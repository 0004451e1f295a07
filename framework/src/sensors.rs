/// Sensor abstraction layer for hardware independence
/// Enables testing, simulation, and swapping the physical chips behind each node
use serde::Serialize;
use thiserror::Error;

/// Raw inertial register block (signed 16-bit counts, as read in one burst)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInertial {
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub temperature: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
}

/// Inertial reading in ×100 fixed-point physical units
///
/// Acceleration in g×100, angular rate in deg/s×100, temperature in °C×100.
/// Divide by 100 to recover physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InertialSample {
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
    /// Kept for raw-register completeness, never sent downstream
    pub temperature: i16,
}

/// The 16 named compass sectors, 22.5° each, clockwise from north
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Bearing {
    #[default]
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

impl Bearing {
    const ALL: [Bearing; 16] = [
        Bearing::N,
        Bearing::NNE,
        Bearing::NE,
        Bearing::ENE,
        Bearing::E,
        Bearing::ESE,
        Bearing::SE,
        Bearing::SSE,
        Bearing::S,
        Bearing::SSW,
        Bearing::SW,
        Bearing::WSW,
        Bearing::W,
        Bearing::WNW,
        Bearing::NW,
        Bearing::NNW,
    ];

    /// Nearest sector for a heading in degrees (any value, wrapped into [0, 360))
    pub fn from_heading(heading_deg: f32) -> Self {
        let wrapped = heading_deg.rem_euclid(360.0);
        let sector = (wrapped / 22.5).round() as usize % 16;
        Self::ALL[sector]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bearing::N => "N",
            Bearing::NNE => "NNE",
            Bearing::NE => "NE",
            Bearing::ENE => "ENE",
            Bearing::E => "E",
            Bearing::ESE => "ESE",
            Bearing::SE => "SE",
            Bearing::SSE => "SSE",
            Bearing::S => "S",
            Bearing::SSW => "SSW",
            Bearing::SW => "SW",
            Bearing::WSW => "WSW",
            Bearing::W => "W",
            Bearing::WNW => "WNW",
            Bearing::NW => "NW",
            Bearing::NNW => "NNW",
        }
    }
}

/// Magnetometer reading as produced by the compass capability
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MagneticSample {
    pub mx: i32,
    pub my: i32,
    pub mz: i32,
    /// Degrees in [0, 360)
    pub heading: f32,
    pub bearing: Bearing,
}

/// Four analog channel voltages (volts, 0.0 - 3.3)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogSample {
    pub v32: f32,
    pub v33: f32,
    pub v34: f32,
    pub v35: f32,
}

/// Number of sampled analog channels
pub const ANALOG_CHANNELS: usize = 4;

/// Errors that can occur when talking to a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    /// Bus transaction was not acknowledged (carries the bus result code)
    #[error("bus transaction failed with code {code}")]
    Bus { code: u8 },
    #[error("sensor not responding")]
    NotResponding,
    #[error("reading out of range: {0}")]
    OutOfRange(&'static str),
}

/// Inertial unit (accelerometer + gyroscope + temperature)
/// Implementations: MPU6050 over I2C, simulated IMU, etc.
pub trait InertialSensor {
    /// One-time hardware bring-up (wake, sample rate)
    fn bring_up(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Read the raw register block in one transaction
    fn read_raw(&mut self) -> Result<RawInertial, SensorError>;
}

/// Three-axis compass that already knows its heading and bearing
/// Implementations: QMC5883L, simulated compass, etc.
pub trait Compass {
    fn bring_up(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<MagneticSample, SensorError>;
}

/// Multi-channel 12-bit ADC
pub trait AnalogInput {
    fn bring_up(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Raw 0-4095 codes, one per channel
    fn read_codes(&mut self) -> Result<[u16; ANALOG_CHANNELS], SensorError>;
}

impl<T: InertialSensor + ?Sized> InertialSensor for Box<T> {
    fn bring_up(&mut self) -> Result<(), SensorError> {
        (**self).bring_up()
    }

    fn read_raw(&mut self) -> Result<RawInertial, SensorError> {
        (**self).read_raw()
    }
}

impl<T: Compass + ?Sized> Compass for Box<T> {
    fn bring_up(&mut self) -> Result<(), SensorError> {
        (**self).bring_up()
    }

    fn read(&mut self) -> Result<MagneticSample, SensorError> {
        (**self).read()
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn bring_up(&mut self) -> Result<(), SensorError> {
        (**self).bring_up()
    }

    fn read_codes(&mut self) -> Result<[u16; ANALOG_CHANNELS], SensorError> {
        (**self).read_codes()
    }
}
