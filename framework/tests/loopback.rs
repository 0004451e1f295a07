//! End-to-end runs over real localhost sockets

use std::io::{BufRead, BufReader, Read};
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mocap_link::binary_telemetry::{DUAL_NODE_PACKET_SIZE, SINGLE_NODE_PACKET_SIZE};
use mocap_link::radio::{spawn_receiver, UdpRadioLink};
use mocap_link::sensor_manager::{AnalogDriver, InertialDriver, MagneticDriver};
use mocap_link::sensors::{InertialSensor, RawInertial};
use mocap_link::sim::{SimulatedAdc, SimulatedCompass, SimulatedImu};
use mocap_link::transport::{
    BroadcastDispatcher, StationCounter, StreamDispatcher, TcpPeerListener, UdpDatagramSink,
};
use mocap_link::{
    DispatchOutcome, PacketAssembler, RemoteLinkBridge, RemoteSample, SecondaryNode,
    SensorError, SensorManager, TelemetryPacket, TransportDispatcher,
};

const DEADLINE: Duration = Duration::from_secs(2);

struct Managers {
    imu: SensorManager<InertialDriver<SimulatedImu>>,
    compass: SensorManager<MagneticDriver<SimulatedCompass>>,
    adc: SensorManager<AnalogDriver<SimulatedAdc>>,
}

impl Managers {
    fn polled(now_ms: u32) -> Self {
        let mut m = Self {
            imu: SensorManager::new(InertialDriver::new(SimulatedImu::new(11)), 0),
            compass: SensorManager::new(MagneticDriver::new(SimulatedCompass::new(12)), 0),
            adc: SensorManager::new(AnalogDriver::new(SimulatedAdc::new(13)), 0),
        };
        m.imu.poll(now_ms);
        m.compass.poll(now_ms);
        m.adc.poll(now_ms);
        m
    }

    fn assembler<'a>(&'a self, remote: Option<&'a RemoteLinkBridge>) -> PacketAssembler<'a> {
        PacketAssembler::new(&self.imu, &self.compass, &self.adc, remote)
    }
}

struct FixedGyro;

impl InertialSensor for FixedGyro {
    fn read_raw(&mut self) -> Result<RawInertial, SensorError> {
        Ok(RawInertial {
            gx: 1310,
            gy: -131,
            gz: 262,
            ..Default::default()
        })
    }
}

fn pc_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(DEADLINE)).unwrap();
    socket
}

#[test]
fn test_broadcast_datagram_reaches_pc() {
    let pc = pc_socket();
    let sink = UdpDatagramSink::bind("127.0.0.1:0", &pc.local_addr().unwrap().to_string()).unwrap();
    let stations = StationCounter::new();
    stations.station_joined();
    let mut dispatcher = BroadcastDispatcher::new(sink, stations, 10);

    let managers = Managers::polled(0);
    let outcome = dispatcher.dispatch(10, &managers.assembler(None));
    assert_eq!(outcome, DispatchOutcome::Sent(SINGLE_NODE_PACKET_SIZE));

    let mut buf = [0u8; 128];
    let (n, _) = pc.recv_from(&mut buf).unwrap();
    assert_eq!(n, SINGLE_NODE_PACKET_SIZE);

    let packet = TelemetryPacket::from_bytes(&buf[..n]).unwrap();
    assert_eq!(packet.timestamp_ms, 10);
    assert_eq!(packet.inertial.ax, managers.imu.reading().ax);
    assert_eq!(packet.magnetic.mx, managers.compass.reading().mx);
}

#[test]
fn test_stream_record_reaches_client() {
    let listener = TcpPeerListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut dispatcher = StreamDispatcher::new(listener, 100);
    let managers = Managers::polled(0);

    let client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(DEADLINE)).unwrap();

    let start = Instant::now();
    let mut now = 100;
    while !dispatcher.dispatch(now, &managers.assembler(None)).is_sent() {
        assert!(start.elapsed() < DEADLINE, "client was never accepted");
        thread::sleep(Duration::from_millis(5));
        now += 100;
    }

    let mut line = String::new();
    BufReader::new(&client).read_line(&mut line).unwrap();
    assert!(line.ends_with('\n'));

    let record: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert!(record["gyro"]["az"].as_f64().unwrap() > 0.5, "gravity on Z");
    assert!(record["mag"]["bearing"].is_string());
    assert!(record.get("slave").is_none());
}

#[test]
fn test_second_client_replaces_first() {
    let listener = TcpPeerListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut dispatcher = StreamDispatcher::new(listener, 100);
    let managers = Managers::polled(0);

    let mut first = TcpStream::connect(addr).unwrap();
    first.set_read_timeout(Some(DEADLINE)).unwrap();
    let start = Instant::now();
    while !dispatcher.has_peer() {
        assert!(start.elapsed() < DEADLINE);
        dispatcher.accept_if_new();
        thread::sleep(Duration::from_millis(5));
    }

    let _second = TcpStream::connect(addr).unwrap();
    let start = Instant::now();
    while !dispatcher.accept_if_new() {
        assert!(start.elapsed() < DEADLINE, "second client was never accepted");
        thread::sleep(Duration::from_millis(5));
    }
    dispatcher.dispatch(100, &managers.assembler(None));

    // The first client sees its connection closed without any record
    let mut buf = Vec::new();
    let n = first.read_to_end(&mut buf).unwrap_or(0);
    assert_eq!(n, 0);
}

#[test]
fn test_stalled_client_never_blocks_dispatch() {
    let listener = TcpPeerListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut dispatcher = StreamDispatcher::new(listener, 100);
    let managers = Managers::polled(0);

    // Connected but never reads: the send buffer eventually fills
    let _client = TcpStream::connect(addr).unwrap();
    let start = Instant::now();
    while !dispatcher.has_peer() {
        assert!(start.elapsed() < DEADLINE, "client was never accepted");
        dispatcher.accept_if_new();
        thread::sleep(Duration::from_millis(5));
    }

    let start = Instant::now();
    let mut worst = Duration::ZERO;
    let mut now = 0u32;
    let mut sent = 0u64;
    loop {
        assert!(
            start.elapsed() < Duration::from_secs(20),
            "send buffer never filled after {} records",
            sent
        );
        now = now.wrapping_add(100);

        let call = Instant::now();
        let outcome = dispatcher.dispatch(now, &managers.assembler(None));
        worst = worst.max(call.elapsed());

        match outcome {
            DispatchOutcome::Sent(_) => sent += 1,
            DispatchOutcome::Dropped => break,
            other => panic!("unexpected outcome {:?} after {} records", other, sent),
        }
    }

    assert!(
        worst < Duration::from_millis(50),
        "dispatch blocked the loop for {:?}",
        worst
    );
    assert!(!dispatcher.has_peer(), "stalled client is dropped");
    assert_eq!(
        dispatcher.dispatch(now.wrapping_add(100), &managers.assembler(None)),
        DispatchOutcome::NoPeer
    );
}

#[test]
fn test_secondary_to_primary_to_pc() {
    let bridge = Arc::new(RemoteLinkBridge::new());
    let target = Arc::clone(&bridge);
    let receiver = spawn_receiver("127.0.0.1:0", move |payload| {
        target.on_receive(payload);
    })
    .unwrap();

    let radio = UdpRadioLink::open("127.0.0.1:0", &receiver.local_addr().to_string()).unwrap();
    let mut secondary = SecondaryNode::new(FixedGyro, radio, 0, 10);
    let expected = RemoteSample {
        gx: 1000,
        gy: -100,
        gz: 200,
    };

    let start = Instant::now();
    let mut now = 0;
    while bridge.latest() != expected {
        assert!(start.elapsed() < DEADLINE, "remote sample never arrived");
        now += 10;
        secondary.tick(now);
        thread::sleep(Duration::from_millis(2));
    }

    let pc = pc_socket();
    let sink = UdpDatagramSink::bind("127.0.0.1:0", &pc.local_addr().unwrap().to_string()).unwrap();
    let stations = StationCounter::new();
    stations.station_joined();
    let mut dispatcher = BroadcastDispatcher::new(sink, stations, 10);

    let managers = Managers::polled(0);
    let outcome = dispatcher.dispatch(20, &managers.assembler(Some(bridge.as_ref())));
    assert_eq!(outcome, DispatchOutcome::Sent(DUAL_NODE_PACKET_SIZE));

    let mut buf = [0u8; 128];
    let (n, _) = pc.recv_from(&mut buf).unwrap();
    let packet = TelemetryPacket::from_bytes(&buf[..n]).unwrap();
    assert_eq!(packet.remote, Some(expected));

    receiver.stop();
}
