/// Broadcast strategy: fixed binary packets as UDP datagrams
/// Fire and forget - no ack, no retry, no sequence number
/// Target: 100 Hz to the first DHCP client on the node's access point
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};

use super::{DispatchOutcome, TelemetryStats, TransportDispatcher, TransportError};
use crate::assembler::PacketAssembler;
use crate::clock::RateGate;

/// Connectionless output channel
pub trait DatagramSink {
    /// Send one datagram; returns the byte count written
    fn send_datagram(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Cheap "is anyone associated" check against the access point
pub trait StationMonitor {
    fn station_count(&self) -> usize;

    fn has_station(&self) -> bool {
        self.station_count() > 0
    }
}

/// Associated-station count, updated from the Wi-Fi event context
///
/// Clones share the same counter: hand one to the event handler.
#[derive(Debug, Clone, Default)]
pub struct StationCounter {
    count: Arc<AtomicUsize>,
}

impl StationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn station_joined(&self) {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Station joined ({} associated)", n);
    }

    /// Never goes below zero
    pub fn station_left(&self) {
        let prev = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        if let Ok(n) = prev {
            info!("Station left ({} associated)", n - 1);
        }
    }
}

impl StationMonitor for StationCounter {
    fn station_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

/// Non-blocking UDP socket with a fixed destination
pub struct UdpDatagramSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpDatagramSink {
    /// Bind `local` and target `dest` (e.g. "0.0.0.0:8888" -> "192.168.4.2:8888")
    pub fn bind(local: &str, dest: &str) -> Result<Self, TransportError> {
        let dest = dest
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| TransportError::InvalidAddress(dest.to_string()))?;

        info!("Binding UDP telemetry socket on {} -> {}", local, dest);
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;

        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl DatagramSink for UdpDatagramSink {
    fn send_datagram(&mut self, data: &[u8]) -> io::Result<usize> {
        self.socket.send_to(data, self.dest)
    }
}

/// Broadcast dispatcher over any sink and station monitor
pub struct BroadcastDispatcher<S: DatagramSink, M: StationMonitor> {
    sink: S,
    stations: M,
    gate: RateGate,
    stats: TelemetryStats,
}

impl<S: DatagramSink, M: StationMonitor> BroadcastDispatcher<S, M> {
    pub fn new(sink: S, stations: M, send_interval_ms: u32) -> Self {
        Self {
            sink,
            stations,
            gate: RateGate::new(send_interval_ms),
            stats: TelemetryStats::default(),
        }
    }

    /// Timestamp of the last elapsed interval (sent or not)
    pub fn last_send_ms(&self) -> u32 {
        self.gate.last_ms()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: DatagramSink, M: StationMonitor> TransportDispatcher for BroadcastDispatcher<S, M> {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn dispatch(&mut self, now_ms: u32, assembler: &PacketAssembler<'_>) -> DispatchOutcome {
        // Interval first: lastSend advances even when nobody is associated
        if !self.gate.try_fire(now_ms) {
            return DispatchOutcome::NotDue;
        }
        if !self.stations.has_station() {
            return DispatchOutcome::NoPeer;
        }

        let packet = assembler.assemble(now_ms).to_bytes();
        let outcome = match self.sink.send_datagram(packet.as_bytes()) {
            Ok(n) => DispatchOutcome::Sent(n),
            Err(e) => {
                debug!("UDP send failed, dropping packet: {}", e);
                DispatchOutcome::Dropped
            }
        };
        self.stats.record(outcome);
        outcome
    }

    fn stats(&self) -> TelemetryStats {
        self.stats
    }

    fn take_stats(&mut self) -> TelemetryStats {
        self.stats.take()
    }
}
