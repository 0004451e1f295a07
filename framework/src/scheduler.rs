/// Cooperative control loop for the primary node
///
/// One `tick()` per host scheduler slot, in a fixed order:
/// inertial poll -> magnetic poll -> analog poll -> dispatch.
/// Every component self-gates on its own timestamp, nothing blocks.
use std::sync::Arc;

use log::info;

use crate::assembler::PacketAssembler;
use crate::remote_link::RemoteLinkBridge;
use crate::sensor_manager::{PollOutcome, PolledSensor};
use crate::sensors::{AnalogSample, InertialSample, MagneticSample, SensorError};
use crate::transport::{DispatchOutcome, TransportDispatcher};

pub type InertialSource = Box<dyn PolledSensor<Sample = InertialSample> + Send>;
pub type MagneticSource = Box<dyn PolledSensor<Sample = MagneticSample> + Send>;
pub type AnalogSource = Box<dyn PolledSensor<Sample = AnalogSample> + Send>;
pub type Dispatcher = Box<dyn TransportDispatcher + Send>;

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub inertial: PollOutcome,
    pub magnetic: PollOutcome,
    pub analog: PollOutcome,
    pub dispatch: DispatchOutcome,
}

impl TickReport {
    /// Number of sensor reads that failed this tick
    pub fn sensor_faults(&self) -> usize {
        [self.inertial, self.magnetic, self.analog]
            .iter()
            .filter(|o| matches!(o, PollOutcome::Failed(_)))
            .count()
    }
}

pub struct SchedulerLoop {
    inertial: InertialSource,
    magnetic: MagneticSource,
    analog: AnalogSource,
    remote: Option<Arc<RemoteLinkBridge>>,
    dispatcher: Dispatcher,
    ticks: u64,
}

impl SchedulerLoop {
    pub fn new(
        inertial: InertialSource,
        magnetic: MagneticSource,
        analog: AnalogSource,
        remote: Option<Arc<RemoteLinkBridge>>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            inertial,
            magnetic,
            analog,
            remote,
            dispatcher,
            ticks: 0,
        }
    }

    /// Bring every sensor up once
    ///
    /// All three are attempted even if one fails; the first error is returned.
    pub fn init(&mut self) -> Result<(), SensorError> {
        info!(
            "Starting scheduler ({} transport, {} node)",
            self.dispatcher.name(),
            if self.remote.is_some() { "dual" } else { "single" }
        );
        let results = [
            self.inertial.init(),
            self.magnetic.init(),
            self.analog.init(),
        ];
        results.into_iter().collect()
    }

    pub fn tick(&mut self, now_ms: u32) -> TickReport {
        self.ticks = self.ticks.wrapping_add(1);

        let inertial = self.inertial.poll(now_ms);
        let magnetic = self.magnetic.poll(now_ms);
        let analog = self.analog.poll(now_ms);

        let assembler = PacketAssembler::new(
            &*self.inertial,
            &*self.magnetic,
            &*self.analog,
            self.remote.as_deref(),
        );
        let dispatch = self.dispatcher.dispatch(now_ms, &assembler);

        TickReport {
            inertial,
            magnetic,
            analog,
            dispatch,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn dispatcher_mut(&mut self) -> &mut dyn TransportDispatcher {
        &mut *self.dispatcher
    }
}
