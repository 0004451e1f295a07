//! Composition roots for the two nodes
//!
//! Each node is built once at startup and owns every component it drives.
//! There is exactly one manager per sensor kind because the node constructs
//! exactly one; nothing is global.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::clock::RateGate;
use crate::config::{SystemConfig, TransportMode};
use crate::remote_link::{RemoteLinkBridge, RemoteSample, REMOTE_SAMPLE_SIZE};
use crate::radio::RadioLink;
use crate::scheduler::{Dispatcher, SchedulerLoop, TickReport};
use crate::sensor_manager::{
    AnalogDriver, InertialDriver, InertialManager, MagneticDriver, PollOutcome, SensorManager,
};
use crate::sensors::{AnalogInput, Compass, InertialSensor, SensorError};
use crate::transport::{
    BroadcastDispatcher, DispatchOutcome, StationCounter, StreamDispatcher, TcpPeerListener,
    TelemetryStats, TransportError, UdpDatagramSink,
};

/// How often the nodes log their send rate
pub const HEARTBEAT_INTERVAL_MS: u32 = 5000;

/// Build the dispatcher selected by `config.transport`
///
/// `stations` is only consulted in Broadcast mode.
pub fn build_dispatcher(
    config: &SystemConfig,
    stations: StationCounter,
) -> Result<Dispatcher, TransportError> {
    let interval = config.send_interval_ms();
    match config.transport {
        TransportMode::Streaming => {
            let listener = TcpPeerListener::bind(&config.network.stream_bind())?;
            Ok(Box::new(StreamDispatcher::new(listener, interval)))
        }
        TransportMode::Broadcast => {
            let sink = UdpDatagramSink::bind(
                &config.network.broadcast_bind(),
                &config.network.pc_address(),
            )?;
            Ok(Box::new(BroadcastDispatcher::new(sink, stations, interval)))
        }
    }
}

/// Primary node: local sensors + optional remote bridge -> PC client
pub struct PrimaryNode {
    scheduler: SchedulerLoop,
    heartbeat: RateGate,
    faults: u32,
}

impl PrimaryNode {
    pub fn new<I, C, A>(
        config: &SystemConfig,
        imu: I,
        compass: C,
        adc: A,
        dispatcher: Dispatcher,
        bridge: Option<Arc<RemoteLinkBridge>>,
    ) -> Self
    where
        I: InertialSensor + Send + 'static,
        C: Compass + Send + 'static,
        A: AnalogInput + Send + 'static,
    {
        let poll = config.poll_interval_ms();
        info!(
            "Primary node: {} transport every {} ms, sensors every {} ms",
            config.transport.as_str(),
            config.send_interval_ms(),
            poll
        );
        if config.radio.dual_node != bridge.is_some() {
            warn!("dual_node setting does not match the remote bridge passed in");
        }

        let scheduler = SchedulerLoop::new(
            Box::new(SensorManager::new(InertialDriver::new(imu), poll)),
            Box::new(SensorManager::new(MagneticDriver::new(compass), poll)),
            Box::new(SensorManager::new(AnalogDriver::new(adc), poll)),
            bridge,
            dispatcher,
        );

        Self {
            scheduler,
            heartbeat: RateGate::new(HEARTBEAT_INTERVAL_MS),
            faults: 0,
        }
    }

    /// Bring all sensors up (once); a failure is reported but not fatal
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.scheduler.init()
    }

    pub fn tick(&mut self, now_ms: u32) -> TickReport {
        let report = self.scheduler.tick(now_ms);
        self.faults = self.faults.wrapping_add(report.sensor_faults() as u32);

        if self.heartbeat.try_fire(now_ms) {
            let stats = self.scheduler.dispatcher_mut().take_stats();
            info!(
                "Telemetry: {} sent, {} failed, {} sensor faults in last {} s",
                stats.sent,
                stats.failed,
                self.faults,
                HEARTBEAT_INTERVAL_MS / 1000
            );
            self.faults = 0;
        }
        report
    }

    pub fn scheduler(&self) -> &SchedulerLoop {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SchedulerLoop {
        &mut self.scheduler
    }
}

/// Secondary node: samples its gyroscope and forwards it over the radio
pub struct SecondaryNode<S: InertialSensor, R: RadioLink> {
    inertial: InertialManager<S>,
    radio: R,
    send_gate: RateGate,
    stats: TelemetryStats,
}

impl<S: InertialSensor, R: RadioLink> SecondaryNode<S, R> {
    pub fn new(imu: S, radio: R, poll_interval_ms: u32, send_interval_ms: u32) -> Self {
        Self {
            inertial: SensorManager::new(InertialDriver::new(imu), poll_interval_ms),
            radio,
            send_gate: RateGate::new(send_interval_ms),
            stats: TelemetryStats::default(),
        }
    }

    /// High-rate polling, radio cadence from `config.radio`
    pub fn from_config(config: &SystemConfig, imu: S, radio: R) -> Self {
        info!(
            "Secondary node: sending to {} every {} ms on channel {}",
            config.radio.peer_mac_string(),
            config.radio.send_interval_ms,
            config.radio.channel
        );
        Self::new(
            imu,
            radio,
            config.sensors.fast_poll_ms,
            config.radio.send_interval_ms,
        )
    }

    pub fn init(&mut self) -> Result<(), SensorError> {
        self.inertial.init()
    }

    /// Poll the IMU, then send gyro x/y/z if the send interval elapsed
    ///
    /// Send failures are dropped; the next interval sends a fresh sample.
    pub fn tick(&mut self, now_ms: u32) -> DispatchOutcome {
        if let PollOutcome::Failed(e) = self.inertial.poll(now_ms) {
            debug!("secondary IMU read failed: {}", e);
        }

        if !self.send_gate.try_fire(now_ms) {
            return DispatchOutcome::NotDue;
        }

        let reading = self.inertial.reading();
        let sample = RemoteSample {
            gx: reading.gx,
            gy: reading.gy,
            gz: reading.gz,
        };

        let outcome = match self.radio.send(&sample.encode()) {
            Ok(()) => DispatchOutcome::Sent(REMOTE_SAMPLE_SIZE),
            Err(e) => {
                debug!("radio send failed: {}", e);
                DispatchOutcome::Dropped
            }
        };
        self.stats.record(outcome);
        outcome
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats
    }

    pub fn take_stats(&mut self) -> TelemetryStats {
        self.stats.take()
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_telemetry::TelemetryPacket;
    use crate::radio::RadioError;
    use crate::sensors::RawInertial;
    use crate::sim::{SimulatedAdc, SimulatedCompass, SimulatedImu};
    use crate::transport::DatagramSink;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl DatagramSink for SharedSink {
        fn send_datagram(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().push(data.to_vec());
            Ok(data.len())
        }
    }

    #[derive(Default)]
    struct MockRadio {
        sent: Vec<Vec<u8>>,
        fail: bool,
    }

    impl RadioLink for MockRadio {
        fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
            if self.fail {
                return Err(RadioError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "no peer",
                )));
            }
            self.sent.push(payload.to_vec());
            Ok(())
        }
    }

    struct StillImu;

    impl InertialSensor for StillImu {
        fn read_raw(&mut self) -> Result<RawInertial, SensorError> {
            Ok(RawInertial {
                gx: 131,
                gy: -262,
                gz: 393,
                az: 16384,
                ..Default::default()
            })
        }
    }

    fn primary(bridge: Option<Arc<RemoteLinkBridge>>) -> (PrimaryNode, SharedSink) {
        let mut config = SystemConfig::default();
        config.radio.dual_node = bridge.is_some();

        let sink = SharedSink::default();
        let stations = StationCounter::new();
        stations.station_joined();
        let dispatcher = Box::new(BroadcastDispatcher::new(
            sink.clone(),
            stations,
            config.send_interval_ms(),
        ));

        let node = PrimaryNode::new(
            &config,
            SimulatedImu::new(1),
            SimulatedCompass::new(2),
            SimulatedAdc::new(3),
            dispatcher,
            bridge,
        );
        (node, sink)
    }

    #[test]
    fn test_primary_sends_at_100hz() {
        let (mut node, sink) = primary(None);
        assert!(node.init().is_ok());

        for now in 0..=1000 {
            node.tick(now);
        }

        let datagrams = sink.0.lock().unwrap();
        assert_eq!(datagrams.len(), 100, "one datagram per 10 ms over 1 s");
        let last = TelemetryPacket::from_bytes(datagrams.last().unwrap()).unwrap();
        assert_eq!(last.timestamp_ms, 1000);
        assert!(last.remote.is_none());
    }

    #[test]
    fn test_primary_dual_node_packets() {
        let bridge = Arc::new(RemoteLinkBridge::new());
        let (mut node, sink) = primary(Some(Arc::clone(&bridge)));
        bridge.on_receive(&RemoteSample { gx: 5, gy: 6, gz: 7 }.encode());

        node.tick(10);
        let datagrams = sink.0.lock().unwrap();
        let packet = TelemetryPacket::from_bytes(&datagrams[0]).unwrap();
        assert_eq!(packet.remote, Some(RemoteSample { gx: 5, gy: 6, gz: 7 }));
    }

    #[test]
    fn test_heartbeat_resets_stats() {
        let (mut node, _) = primary(None);
        for now in 0..HEARTBEAT_INTERVAL_MS {
            node.tick(now);
        }
        assert_eq!(node.scheduler_mut().dispatcher_mut().stats().sent, 499);
        node.tick(HEARTBEAT_INTERVAL_MS);
        assert_eq!(node.scheduler_mut().dispatcher_mut().stats().sent, 0);
    }

    #[test]
    fn test_broadcast_socket_holds_its_fixed_port() {
        let port = std::net::UdpSocket::bind("0.0.0.0:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut config = SystemConfig::default();
        config.network.broadcast_port = port;
        config.network.pc_host = "127.0.0.1";

        let dispatcher = build_dispatcher(&config, StationCounter::new()).unwrap();
        assert_eq!(dispatcher.name(), "broadcast");
        assert!(
            std::net::UdpSocket::bind(("0.0.0.0", port)).is_err(),
            "port {} should be taken by the dispatcher",
            port
        );
    }

    #[test]
    fn test_secondary_sends_gyro_every_10ms() {
        let mut node = SecondaryNode::new(StillImu, MockRadio::default(), 0, 10);
        for now in 0..=100 {
            node.tick(now);
        }

        let sent = &node.radio_mut().sent;
        assert_eq!(sent.len(), 10);
        assert!(sent.iter().all(|p| p.len() == REMOTE_SAMPLE_SIZE));
        assert_eq!(
            RemoteSample::decode(&sent[0]),
            Some(RemoteSample {
                gx: 100,
                gy: -200,
                gz: 300
            })
        );
    }

    #[test]
    fn test_secondary_drops_failed_sends() {
        let mut node = SecondaryNode::new(StillImu, MockRadio::default(), 0, 10);
        node.radio_mut().fail = true;

        assert_eq!(node.tick(10), DispatchOutcome::Dropped);
        assert_eq!(node.tick(15), DispatchOutcome::NotDue, "no retry");

        node.radio_mut().fail = false;
        assert_eq!(node.tick(20), DispatchOutcome::Sent(REMOTE_SAMPLE_SIZE));
        assert_eq!(node.take_stats(), TelemetryStats { sent: 1, failed: 1 });
    }

    #[test]
    fn test_secondary_from_config() {
        let config = SystemConfig::default();
        let mut node = SecondaryNode::from_config(&config, StillImu, MockRadio::default());
        assert!(node.init().is_ok());
        assert_eq!(node.tick(5), DispatchOutcome::NotDue);
        assert!(node.tick(10).is_sent());
    }
}
