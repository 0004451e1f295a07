/// Simulated sensor capabilities for bench runs without hardware
///
/// Deterministic: every simulator is seeded, so two runs with the same seed
/// produce the same readings. Each can inject a bus fault every N reads to
/// exercise the stale-sample path.
use std::f32::consts::PI;

use crate::sensors::{
    AnalogInput, Bearing, Compass, InertialSensor, MagneticSample, RawInertial, SensorError,
    ANALOG_CHANNELS,
};

/// Bus result code reported by injected faults (address NACK)
pub const SIM_FAULT_CODE: u8 = 2;

/// Simple LCG noise source
#[derive(Debug, Clone)]
pub struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns noise in range [-amplitude, +amplitude]
    pub fn next(&mut self, amplitude: f32) -> f32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let normalized = (self.state as f32 / u32::MAX as f32) * 2.0 - 1.0;
        normalized * amplitude
    }
}

#[derive(Debug, Clone, Default)]
struct FaultPlan {
    every: Option<u32>,
    reads: u32,
}

impl FaultPlan {
    /// Count one read; true when this read should fail
    fn tick(&mut self) -> bool {
        self.reads = self.reads.wrapping_add(1);
        matches!(self.every, Some(n) if n > 0 && self.reads % n == 0)
    }
}

fn saturate_i16(value: f32) -> i16 {
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Inertial unit lying flat, slowly rocking about X
pub struct SimulatedImu {
    noise: NoiseGen,
    faults: FaultPlan,
    phase: f32,
}

impl SimulatedImu {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: NoiseGen::new(seed),
            faults: FaultPlan::default(),
            phase: 0.0,
        }
    }

    /// Fail every `n`th read with a bus error
    pub fn with_fault_every(mut self, n: u32) -> Self {
        self.faults.every = Some(n);
        self
    }
}

impl InertialSensor for SimulatedImu {
    fn read_raw(&mut self) -> Result<RawInertial, SensorError> {
        if self.faults.tick() {
            return Err(SensorError::Bus {
                code: SIM_FAULT_CODE,
            });
        }

        self.phase = (self.phase + 0.01) % (2.0 * PI);
        let rock = self.phase.sin();

        // 16384 counts/g, 131 counts/(deg/s), 340 counts/°C around 36.53
        Ok(RawInertial {
            ax: saturate_i16(self.noise.next(0.02 * 16384.0)),
            ay: saturate_i16(rock * 0.1 * 16384.0 + self.noise.next(0.02 * 16384.0)),
            az: saturate_i16(16384.0 + self.noise.next(0.02 * 16384.0)),
            temperature: saturate_i16(-3000.0 + self.noise.next(20.0)),
            gx: saturate_i16(rock * 30.0 * 131.0 + self.noise.next(0.5 * 131.0)),
            gy: saturate_i16(self.noise.next(0.5 * 131.0)),
            gz: saturate_i16(self.noise.next(0.5 * 131.0)),
        })
    }
}

/// Compass turning slowly clockwise
pub struct SimulatedCompass {
    noise: NoiseGen,
    faults: FaultPlan,
    heading: f32,
    /// Degrees per read
    turn_rate: f32,
}

impl SimulatedCompass {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: NoiseGen::new(seed),
            faults: FaultPlan::default(),
            heading: 0.0,
            turn_rate: 1.5,
        }
    }

    pub fn with_fault_every(mut self, n: u32) -> Self {
        self.faults.every = Some(n);
        self
    }
}

/// Wrap into `[0, 360)`
///
/// `rem_euclid` of a tiny negative angle rounds up to exactly 360.0 in f32.
fn wrap_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn heading_from_axes(mx: i32, my: i32) -> f32 {
    wrap_degrees((my as f32).atan2(mx as f32).to_degrees())
}

impl Compass for SimulatedCompass {
    fn read(&mut self) -> Result<MagneticSample, SensorError> {
        if self.faults.tick() {
            return Err(SensorError::NotResponding);
        }

        self.heading = wrap_degrees(self.heading + self.turn_rate);
        let rad = self.heading.to_radians();
        let field = 1500.0;

        let mx = (rad.cos() * field + self.noise.next(10.0)) as i32;
        let my = (rad.sin() * field + self.noise.next(10.0)) as i32;
        let mz = (-400.0 + self.noise.next(10.0)) as i32;

        // Heading from the axes, like the real chip driver does it
        let heading = heading_from_axes(mx, my);

        Ok(MagneticSample {
            mx,
            my,
            mz,
            heading,
            bearing: Bearing::from_heading(heading),
        })
    }
}

/// Four potentiometer-like channels drifting around fixed levels
pub struct SimulatedAdc {
    noise: NoiseGen,
    faults: FaultPlan,
    levels: [f32; ANALOG_CHANNELS],
}

impl SimulatedAdc {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: NoiseGen::new(seed),
            faults: FaultPlan::default(),
            levels: [512.0, 1536.0, 2560.0, 3584.0],
        }
    }

    pub fn with_fault_every(mut self, n: u32) -> Self {
        self.faults.every = Some(n);
        self
    }
}

impl AnalogInput for SimulatedAdc {
    fn read_codes(&mut self) -> Result<[u16; ANALOG_CHANNELS], SensorError> {
        if self.faults.tick() {
            return Err(SensorError::NotResponding);
        }

        let mut codes = [0u16; ANALOG_CHANNELS];
        for (code, level) in codes.iter_mut().zip(self.levels) {
            *code = (level + self.noise.next(40.0)).clamp(0.0, 4095.0) as u16;
        }
        Ok(codes)
    }
}
