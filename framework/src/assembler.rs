/// Packet assembly from the latest local and remote readings
///
/// Pure function of current manager state: no hardware access, no side
/// effects, cannot fail. Absent remote data shows up as zero-filled fields.
use crate::binary_telemetry::TelemetryPacket;
use crate::remote_link::RemoteLinkBridge;
use crate::sensor_manager::PolledSensor;
use crate::sensors::{AnalogSample, InertialSample, MagneticSample};

/// Borrowing view over every source a packet is built from
pub struct PacketAssembler<'a> {
    inertial: &'a dyn PolledSensor<Sample = InertialSample>,
    magnetic: &'a dyn PolledSensor<Sample = MagneticSample>,
    analog: &'a dyn PolledSensor<Sample = AnalogSample>,
    remote: Option<&'a RemoteLinkBridge>,
}

impl<'a> PacketAssembler<'a> {
    /// `remote` is `Some` only in the dual-node variant
    pub fn new(
        inertial: &'a dyn PolledSensor<Sample = InertialSample>,
        magnetic: &'a dyn PolledSensor<Sample = MagneticSample>,
        analog: &'a dyn PolledSensor<Sample = AnalogSample>,
        remote: Option<&'a RemoteLinkBridge>,
    ) -> Self {
        Self {
            inertial,
            magnetic,
            analog,
            remote,
        }
    }

    /// Snapshot every source and stamp the packet with `now_ms`
    pub fn assemble(&self, now_ms: u32) -> TelemetryPacket {
        TelemetryPacket {
            inertial: self.inertial.reading(),
            magnetic: self.magnetic.reading(),
            analog: self.analog.reading(),
            remote: self.remote.map(RemoteLinkBridge::latest),
            timestamp_ms: now_ms,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::remote_link::RemoteSample;
    use crate::sensor_manager::{PollOutcome, SensorKind};
    use crate::sensors::Bearing;

    /// Source that always returns the same sample
    pub(crate) struct Fixed<T>(pub T, pub SensorKind);

    impl<T: Copy> PolledSensor for Fixed<T> {
        type Sample = T;

        fn kind(&self) -> SensorKind {
            self.1
        }

        fn poll(&mut self, _now_ms: u32) -> PollOutcome {
            PollOutcome::Skipped
        }

        fn reading(&self) -> T {
            self.0
        }
    }

    pub(crate) fn fixed_sources() -> (
        Fixed<InertialSample>,
        Fixed<MagneticSample>,
        Fixed<AnalogSample>,
    ) {
        (
            Fixed(
                InertialSample {
                    ax: 1,
                    ay: 2,
                    az: 3,
                    gx: 4,
                    gy: 5,
                    gz: 6,
                    temperature: 7,
                },
                SensorKind::Inertial,
            ),
            Fixed(
                MagneticSample {
                    mx: 10,
                    my: 20,
                    mz: 30,
                    heading: 200.0,
                    bearing: Bearing::SSW,
                },
                SensorKind::Magnetic,
            ),
            Fixed(
                AnalogSample {
                    v32: 0.1,
                    v33: 0.2,
                    v34: 0.3,
                    v35: 0.4,
                },
                SensorKind::Analog,
            ),
        )
    }

    #[test]
    fn test_timestamp_equals_now() {
        let (i, m, a) = fixed_sources();
        let assembler = PacketAssembler::new(&i, &m, &a, None);
        for now in [0u32, 1, 10_000, u32::MAX] {
            assert_eq!(assembler.assemble(now).timestamp_ms, now);
        }
    }

    #[test]
    fn test_fields_match_sources() {
        let (i, m, a) = fixed_sources();
        let packet = PacketAssembler::new(&i, &m, &a, None).assemble(42);
        assert_eq!(packet.inertial, i.0);
        assert_eq!(packet.magnetic, m.0);
        assert_eq!(packet.analog, a.0);
        assert_eq!(packet.remote, None);
    }

    #[test]
    fn test_remote_zero_filled_until_received() {
        let (i, m, a) = fixed_sources();
        let bridge = RemoteLinkBridge::new();
        let assembler = PacketAssembler::new(&i, &m, &a, Some(&bridge));

        assert_eq!(assembler.assemble(0).remote, Some(RemoteSample::default()));

        let sample = RemoteSample { gx: 7, gy: 8, gz: 9 };
        bridge.on_receive(&sample.encode());
        assert_eq!(assembler.assemble(1).remote, Some(sample));
    }

    #[test]
    fn test_assembly_has_no_side_effects() {
        let (i, m, a) = fixed_sources();
        let assembler = PacketAssembler::new(&i, &m, &a, None);
        assert_eq!(assembler.assemble(5), assembler.assemble(5));
    }
}
