//! Secondary node on a bench host
//!
//! Samples a simulated gyroscope and forwards gyro x/y/z to the primary
//! node every 10 ms over the radio stand-in (UDP to `RADIO_PEER`).
//!
//! # Usage
//!
//! ```bash
//! RADIO_PEER=127.0.0.1:8890 cargo run -p secondary-node
//! ```

use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use mocap_link::clock::{BootClock, Clock, RateGate};
use mocap_link::config::SystemConfig;
use mocap_link::node::HEARTBEAT_INTERVAL_MS;
use mocap_link::radio::UdpRadioLink;
use mocap_link::sim::SimulatedImu;
use mocap_link::SecondaryNode;

const TICK: Duration = Duration::from_millis(1);

/// Forward simulated gyro samples to the primary node
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Stop after N seconds (runs forever when absent)
    #[arg(short, long)]
    seconds: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args.seconds) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(seconds: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let config = SystemConfig::from_env()?;

    info!("=== Motion Capture Secondary Node ===");
    let radio = UdpRadioLink::open("0.0.0.0:0", config.radio.peer)?;
    let mut node = SecondaryNode::from_config(&config, SimulatedImu::new(0x4242), radio);
    if let Err(e) = node.init() {
        warn!("IMU bring-up failed, sending zeros until it recovers: {}", e);
    }

    let clock = BootClock::new();
    let mut heartbeat = RateGate::new(HEARTBEAT_INTERVAL_MS);
    let stop_at_ms = seconds.map(|s| s.saturating_mul(1000));

    loop {
        let now_ms = clock.now_ms();
        if stop_at_ms.is_some_and(|stop| now_ms >= stop) {
            break;
        }

        node.tick(now_ms);

        if heartbeat.try_fire(now_ms) {
            let stats = node.take_stats();
            info!(
                "Radio: {} sent, {} failed in last {} s",
                stats.sent,
                stats.failed,
                HEARTBEAT_INTERVAL_MS / 1000
            );
        }
        thread::sleep(TICK);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_is_optional() {
        assert!(Args::try_parse_from(["secondary-node"]).unwrap().seconds.is_none());
        let args = Args::try_parse_from(["secondary-node", "-s", "5"]).unwrap();
        assert_eq!(args.seconds, Some(5));
        assert!(Args::try_parse_from(["secondary-node", "--seconds", "-1"]).is_err());
    }
}
