/// Sensor acquisition managers with "last known reading" semantics
///
/// Design:
/// - Each manager exclusively owns one sensor capability and its last sample
/// - `poll()` re-reads only when the poll interval has elapsed
/// - `reading()` is a cheap copy, it never touches hardware
/// - A failed transaction is logged and the previous sample is kept
use log::{debug, info, warn};

use crate::clock::RateGate;
use crate::scaling::{adc_to_voltage, scale_accel, scale_gyro, scale_temperature};
use crate::sensors::{
    AnalogInput, AnalogSample, Compass, InertialSample, InertialSensor, MagneticSample,
    SensorError,
};

/// Which physical sensor a manager wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Inertial,
    Magnetic,
    Analog,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Inertial => "inertial",
            SensorKind::Magnetic => "magnetic",
            SensorKind::Analog => "analog",
        }
    }
}

/// Result of one `poll()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Interval not elapsed, nothing touched
    Skipped,
    /// Sensor re-read, sample replaced
    Updated,
    /// Sensor re-read failed, previous sample retained
    Failed(SensorError),
}

/// Adapter between a physical capability and the sample a manager stores
pub trait SensorDriver {
    type Sample: Copy + Default;

    const KIND: SensorKind;

    /// One-time hardware bring-up
    fn bring_up(&mut self) -> Result<(), SensorError>;

    /// One hardware transaction producing a complete sample
    fn acquire(&mut self) -> Result<Self::Sample, SensorError>;
}

/// Object-safe view of a manager, used by the scheduler and the assembler
pub trait PolledSensor {
    type Sample: Copy;

    fn kind(&self) -> SensorKind;

    /// One-time bring-up; later calls are no-ops
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    /// Re-read the sensor if the poll interval has elapsed
    fn poll(&mut self, now_ms: u32) -> PollOutcome;

    /// Last successfully captured sample
    fn reading(&self) -> Self::Sample;
}

/// Owns one sensor and its most recent sample
pub struct SensorManager<D: SensorDriver> {
    driver: D,
    sample: D::Sample,
    gate: RateGate,
    initialized: bool,
    read_count: u32,
    fault_count: u32,
}

impl<D: SensorDriver> SensorManager<D> {
    /// Create a manager polling every `poll_interval_ms` (0 = every tick)
    pub fn new(driver: D, poll_interval_ms: u32) -> Self {
        Self {
            driver,
            sample: D::Sample::default(),
            gate: RateGate::new(poll_interval_ms),
            initialized: false,
            read_count: 0,
            fault_count: 0,
        }
    }

    /// One-time hardware bring-up
    ///
    /// Idempotent: only the first call talks to the hardware. A bring-up
    /// failure is logged and returned, and the manager keeps polling anyway
    /// so a sensor that recovers later still produces data.
    pub fn init(&mut self) -> Result<(), SensorError> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;

        info!("Bringing up {} sensor", D::KIND.name());
        match self.driver.bring_up() {
            Ok(()) => {
                info!("{} sensor ready", D::KIND.name());
                Ok(())
            }
            Err(e) => {
                warn!("{} sensor bring-up failed: {}", D::KIND.name(), e);
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Re-read the sensor if `now_ms - last_read >= interval`
    ///
    /// The read timestamp advances on every attempt, successful or not:
    /// a failing sensor is retried on the next natural interval only.
    pub fn poll(&mut self, now_ms: u32) -> PollOutcome {
        if !self.gate.try_fire(now_ms) {
            return PollOutcome::Skipped;
        }

        match self.driver.acquire() {
            Ok(sample) => {
                self.sample = sample;
                self.read_count = self.read_count.wrapping_add(1);
                PollOutcome::Updated
            }
            Err(e) => {
                self.fault_count = self.fault_count.wrapping_add(1);
                warn!(
                    "{} read failed at {} ms: {} (keeping previous sample)",
                    D::KIND.name(),
                    now_ms,
                    e
                );
                PollOutcome::Failed(e)
            }
        }
    }

    /// Last successfully captured sample (copy)
    pub fn reading(&self) -> D::Sample {
        self.sample
    }

    /// (successful reads, failed reads) since start
    pub fn stats(&self) -> (u32, u32) {
        (self.read_count, self.fault_count)
    }

    pub fn poll_interval_ms(&self) -> u32 {
        self.gate.interval_ms()
    }

    /// Access the wrapped driver (bench tooling, fault injection)
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: SensorDriver> PolledSensor for SensorManager<D> {
    type Sample = D::Sample;

    fn kind(&self) -> SensorKind {
        D::KIND
    }

    fn init(&mut self) -> Result<(), SensorError> {
        SensorManager::init(self)
    }

    fn poll(&mut self, now_ms: u32) -> PollOutcome {
        SensorManager::poll(self, now_ms)
    }

    fn reading(&self) -> D::Sample {
        SensorManager::reading(self)
    }
}

/// Inertial capability scaled to ×100 fixed-point
pub struct InertialDriver<S> {
    sensor: S,
}

impl<S: InertialSensor> InertialDriver<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }
}

impl<S: InertialSensor> SensorDriver for InertialDriver<S> {
    type Sample = InertialSample;

    const KIND: SensorKind = SensorKind::Inertial;

    fn bring_up(&mut self) -> Result<(), SensorError> {
        self.sensor.bring_up()
    }

    fn acquire(&mut self) -> Result<InertialSample, SensorError> {
        let raw = self.sensor.read_raw()?;
        Ok(InertialSample {
            ax: scale_accel(raw.ax),
            ay: scale_accel(raw.ay),
            az: scale_accel(raw.az),
            gx: scale_gyro(raw.gx),
            gy: scale_gyro(raw.gy),
            gz: scale_gyro(raw.gz),
            temperature: scale_temperature(raw.temperature),
        })
    }
}

/// Compass capability, passed through unmodified
pub struct MagneticDriver<C> {
    compass: C,
}

impl<C: Compass> MagneticDriver<C> {
    pub fn new(compass: C) -> Self {
        Self { compass }
    }
}

impl<C: Compass> SensorDriver for MagneticDriver<C> {
    type Sample = MagneticSample;

    const KIND: SensorKind = SensorKind::Magnetic;

    fn bring_up(&mut self) -> Result<(), SensorError> {
        self.compass.bring_up()
    }

    fn acquire(&mut self) -> Result<MagneticSample, SensorError> {
        self.compass.read()
    }
}

/// 12-bit ADC capability converted to volts
pub struct AnalogDriver<A> {
    adc: A,
}

impl<A: AnalogInput> AnalogDriver<A> {
    pub fn new(adc: A) -> Self {
        Self { adc }
    }
}

impl<A: AnalogInput> SensorDriver for AnalogDriver<A> {
    type Sample = AnalogSample;

    const KIND: SensorKind = SensorKind::Analog;

    fn bring_up(&mut self) -> Result<(), SensorError> {
        self.adc.bring_up()
    }

    fn acquire(&mut self) -> Result<AnalogSample, SensorError> {
        let codes = self.adc.read_codes()?;
        if let Some(code) = codes.iter().find(|&&c| c > 4095) {
            debug!("ADC code {} above 12-bit range", code);
            return Err(SensorError::OutOfRange("adc code above 4095"));
        }
        Ok(AnalogSample {
            v32: adc_to_voltage(codes[0]),
            v33: adc_to_voltage(codes[1]),
            v34: adc_to_voltage(codes[2]),
            v35: adc_to_voltage(codes[3]),
        })
    }
}

pub type InertialManager<S> = SensorManager<InertialDriver<S>>;
pub type MagneticManager<C> = SensorManager<MagneticDriver<C>>;
pub type AnalogManager<A> = SensorManager<AnalogDriver<A>>;
