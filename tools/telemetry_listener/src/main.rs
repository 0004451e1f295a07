//! PC-side telemetry listener
//!
//! Receives Broadcast datagrams (or connects to the Streaming socket),
//! validates and decodes each record, and prints it. Datagrams may arrive
//! with gaps or out of order; the listener reports both instead of hiding
//! them.
//!
//! # Usage
//!
//! ```bash
//! telemetry-listener                       # UDP on port 8888
//! telemetry-listener --udp 9100 --count 500
//! telemetry-listener --tcp 192.168.4.1:8888
//! telemetry-listener --summary             # one line per second
//! ```

use std::io::{BufRead, BufReader};
use std::net::{TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use mocap_link::TelemetryPacket;

/// Receive and decode motion-capture telemetry
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Listen for binary datagrams on this port
    #[arg(short, long, default_value_t = 8888)]
    udp: u16,

    /// Connect to a streaming node and read text records instead
    #[arg(short, long)]
    tcp: Option<String>,

    /// Stop after N records
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Print a rate summary once per second instead
    #[arg(long)]
    summary: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = match &args.tcp {
        Some(addr) => read_stream(addr, &args),
        None => listen_udp(args.udp, &args),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Records per second, gaps and reorders since the last report
#[derive(Default)]
struct RateWindow {
    received: u64,
    rejected: u64,
    reordered: u64,
    last_timestamp: Option<u32>,
}

impl RateWindow {
    fn observe(&mut self, timestamp_ms: u32) {
        self.received += 1;
        if let Some(last) = self.last_timestamp {
            // Wrapping: a small negative difference is a reorder, not a wrap
            if (timestamp_ms.wrapping_sub(last) as i32) < 0 {
                self.reordered += 1;
                return;
            }
        }
        self.last_timestamp = Some(timestamp_ms);
    }
}

fn listen_udp(port: u16, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    socket.set_read_timeout(Some(Duration::from_secs(1)))?;
    info!("Listening for telemetry datagrams on port {}", port);

    let mut buf = [0u8; 1500];
    let mut total = 0u64;
    let mut window = RateWindow::default();
    let mut window_start = Instant::now();

    while args.count.map_or(true, |n| total < n) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => match TelemetryPacket::from_bytes(&buf[..n]) {
                Ok(packet) => {
                    total += 1;
                    window.observe(packet.timestamp_ms);
                    if !args.summary {
                        print_packet(&packet);
                    }
                }
                Err(e) => {
                    window.rejected += 1;
                    warn!("Rejected datagram from {}: {}", from, e);
                }
            },
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => return Err(e.into()),
        }

        if args.summary && window_start.elapsed() >= Duration::from_secs(1) {
            println!(
                "{} pkt/s, {} rejected, {} out of order",
                window.received, window.rejected, window.reordered
            );
            window = RateWindow {
                last_timestamp: window.last_timestamp,
                ..Default::default()
            };
            window_start = Instant::now();
        }
    }
    Ok(())
}

fn print_packet(p: &TelemetryPacket) {
    let i = &p.inertial;
    let m = &p.magnetic;
    let a = &p.analog;
    print!(
        "[{:>10} ms] acc ({:6.2},{:6.2},{:6.2}) g  gyro ({:7.2},{:7.2},{:7.2}) dps  \
         mag ({},{},{}) {:5.1}° {:<3}  adc {:.3} {:.3} {:.3} {:.3} V",
        p.timestamp_ms,
        i.ax as f32 / 100.0,
        i.ay as f32 / 100.0,
        i.az as f32 / 100.0,
        i.gx as f32 / 100.0,
        i.gy as f32 / 100.0,
        i.gz as f32 / 100.0,
        m.mx,
        m.my,
        m.mz,
        m.heading,
        m.bearing.as_str(),
        a.v32,
        a.v33,
        a.v34,
        a.v35
    );
    if let Some(r) = p.remote {
        print!(
            "  slave ({:7.2},{:7.2},{:7.2}) dps",
            r.gx as f32 / 100.0,
            r.gy as f32 / 100.0,
            r.gz as f32 / 100.0
        );
    }
    println!();
}

fn read_stream(addr: &str, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to telemetry stream at {}", addr);
    let stream = TcpStream::connect(addr)?;
    info!("Connected");

    let mut total = 0u64;
    for line in BufReader::new(stream).lines() {
        let line = line?;
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(record) => {
                total += 1;
                if !args.summary {
                    println!("{}", record);
                }
            }
            Err(e) => warn!("Malformed record: {}", e),
        }
        if args.count.is_some_and(|n| total >= n) {
            break;
        }
    }

    info!("Stream closed after {} records", total);
    Ok(())
}
