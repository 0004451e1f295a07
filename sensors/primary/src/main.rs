//! Primary node on a bench host
//!
//! Simulated local sensors, the remote bridge fed by the secondary node over
//! the radio stand-in, and the telemetry transport selected at build time.
//!
//! # Usage
//!
//! ```bash
//! TRANSPORT_MODE=streaming cargo run -p primary-node
//! PC_ADDRESS=127.0.0.1 DUAL_NODE=1 cargo run -p primary-node -- --seconds 30
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use mocap_link::clock::{BootClock, Clock};
use mocap_link::config::{SystemConfig, TransportMode};
use mocap_link::node::{build_dispatcher, PrimaryNode};
use mocap_link::radio::spawn_receiver;
use mocap_link::sim::{SimulatedAdc, SimulatedCompass, SimulatedImu};
use mocap_link::transport::StationCounter;
use mocap_link::RemoteLinkBridge;

/// Loop tick (the host scheduler's slot)
const TICK: Duration = Duration::from_millis(1);

/// Run the primary telemetry node with simulated sensors
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Stop after N seconds (runs forever when absent)
    #[arg(short, long)]
    seconds: Option<u32>,

    /// Start with no PC associated (Broadcast stays idle)
    #[arg(long)]
    no_station: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = SystemConfig::from_env()?;

    info!("=== Motion Capture Primary Node ===");
    info!(
        "SSID: {}, transport: {}, rate: {} Hz, dual node: {}",
        config.network.wifi_ssid,
        config.transport.as_str(),
        1000 / config.send_interval_ms(),
        config.radio.dual_node
    );

    let stations = StationCounter::new();
    // Bench host has no access point: treat the PC as associated
    if config.transport == TransportMode::Broadcast && !args.no_station {
        info!("No access point on this host, assuming {} is associated", config.network.pc_host);
        stations.station_joined();
    }
    let dispatcher = build_dispatcher(&config, stations)?;

    // Receive context: the only writer of the bridge
    let (bridge, _receiver) = if config.radio.dual_node {
        let bridge = Arc::new(RemoteLinkBridge::new());
        let target = Arc::clone(&bridge);
        let receiver = spawn_receiver(config.radio.bind, move |payload| {
            target.on_receive(payload);
        })?;
        (Some(bridge), Some(receiver))
    } else {
        (None, None)
    };

    let mut node = PrimaryNode::new(
        &config,
        SimulatedImu::new(0x1234),
        SimulatedCompass::new(0x5678),
        SimulatedAdc::new(0x9abc),
        dispatcher,
        bridge,
    );
    if let Err(e) = node.init() {
        warn!("Continuing with a sensor that failed bring-up: {}", e);
    }

    let clock = BootClock::new();
    let stop_at_ms = args.seconds.map(|s| s.saturating_mul(1000));
    info!("Entering main loop");

    loop {
        let now_ms = clock.now_ms();
        if stop_at_ms.is_some_and(|stop| now_ms >= stop) {
            break;
        }
        node.tick(now_ms);
        thread::sleep(TICK);
    }

    info!("Stopped after {} ticks", node.scheduler().ticks());
    Ok(())
}
