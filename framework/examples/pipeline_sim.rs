//! Simulates the primary node pipeline against an in-memory PC client
//!
//! Runs ten seconds of simulated time at a 1 ms tick: simulated sensors
//! (with injected bus faults), a secondary node feeding the remote bridge,
//! and the Broadcast dispatcher writing into a capture buffer instead of a
//! socket. Checks the send rate and decodes what the PC would receive.
//!
//! Run with: cargo run -p mocap-link --example pipeline_sim

use std::io;
use std::sync::{Arc, Mutex};

use mocap_link::config::SystemConfig;
use mocap_link::radio::{RadioError, RadioLink};
use mocap_link::sim::{SimulatedAdc, SimulatedCompass, SimulatedImu};
use mocap_link::transport::{BroadcastDispatcher, DatagramSink, StationCounter};
use mocap_link::{PrimaryNode, RemoteLinkBridge, SecondaryNode, TelemetryPacket};

const SIM_DURATION_MS: u32 = 10_000;

/// Collects every datagram the dispatcher emits
#[derive(Clone, Default)]
struct CaptureSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl DatagramSink for CaptureSink {
    fn send_datagram(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut captured = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture poisoned"))?;
        captured.push(data.to_vec());
        Ok(data.len())
    }
}

/// Radio that hands payloads straight to the primary node's bridge
struct DirectRadio(Arc<RemoteLinkBridge>);

impl RadioLink for DirectRadio {
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.0.on_receive(payload);
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = SystemConfig::default();
    config.radio.dual_node = true;

    println!("=== Primary Node Pipeline Simulation ===\n");
    println!(
        "Transport: {} every {} ms, sensors every {} ms, {} s simulated\n",
        config.transport.as_str(),
        config.send_interval_ms(),
        config.poll_interval_ms(),
        SIM_DURATION_MS / 1000
    );

    let bridge = Arc::new(RemoteLinkBridge::new());
    let capture = CaptureSink::default();
    let stations = StationCounter::new();

    let dispatcher = Box::new(BroadcastDispatcher::new(
        capture.clone(),
        stations.clone(),
        config.send_interval_ms(),
    ));
    let mut primary = PrimaryNode::new(
        &config,
        SimulatedImu::new(42).with_fault_every(97),
        SimulatedCompass::new(43).with_fault_every(211),
        SimulatedAdc::new(44),
        dispatcher,
        Some(Arc::clone(&bridge)),
    );
    let mut secondary =
        SecondaryNode::from_config(&config, SimulatedImu::new(7), DirectRadio(Arc::clone(&bridge)));

    if let Err(e) = primary.init().and_then(|_| secondary.init()) {
        println!("Sensor bring-up failed: {}", e);
        return;
    }

    // PC joins the access point one second in
    let mut faults = 0usize;
    for now in 0..=SIM_DURATION_MS {
        if now == 1000 {
            stations.station_joined();
        }
        secondary.tick(now);
        faults += primary.tick(now).sensor_faults();
    }

    let captured = match capture.0.lock() {
        Ok(captured) => captured.clone(),
        Err(_) => {
            println!("Capture buffer poisoned");
            return;
        }
    };

    let expected = (SIM_DURATION_MS - 1000) / config.send_interval_ms() + 1;
    println!("Datagrams captured: {} (expected {})", captured.len(), expected);
    println!("Sensor faults absorbed: {}", faults);
    println!("Secondary node sends: {}", secondary.stats().sent);

    let decoded: Vec<TelemetryPacket> = captured
        .iter()
        .filter_map(|bytes| TelemetryPacket::from_bytes(bytes).ok())
        .collect();
    println!("Decoded cleanly: {}/{}", decoded.len(), captured.len());

    let gaps = decoded
        .windows(2)
        .filter(|w| w[1].timestamp_ms.wrapping_sub(w[0].timestamp_ms) != config.send_interval_ms())
        .count();
    println!("Timestamp gaps: {}", gaps);

    if let Some(last) = decoded.last() {
        println!("\nLast packet at {} ms:", last.timestamp_ms);
        println!(
            "  accel: ({:.2}, {:.2}, {:.2}) g",
            last.inertial.ax as f32 / 100.0,
            last.inertial.ay as f32 / 100.0,
            last.inertial.az as f32 / 100.0
        );
        println!(
            "  gyro:  ({:.2}, {:.2}, {:.2}) deg/s",
            last.inertial.gx as f32 / 100.0,
            last.inertial.gy as f32 / 100.0,
            last.inertial.gz as f32 / 100.0
        );
        println!(
            "  heading: {:.1} deg ({})",
            last.magnetic.heading,
            last.magnetic.bearing.as_str()
        );
        println!(
            "  adc: {:.3} {:.3} {:.3} {:.3} V",
            last.analog.v32, last.analog.v33, last.analog.v34, last.analog.v35
        );
        if let Some(remote) = last.remote {
            println!(
                "  remote gyro: ({:.2}, {:.2}, {:.2}) deg/s",
                remote.gx as f32 / 100.0,
                remote.gy as f32 / 100.0,
                remote.gz as f32 / 100.0
            );
        }
    }

    println!("\n=== Simulation Complete ===");
}
