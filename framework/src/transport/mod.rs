//! Rate-gated telemetry dispatch to the PC client
//!
//! Two interchangeable strategies behind [`TransportDispatcher`]:
//! - [`StreamDispatcher`]: newline-terminated text records over TCP, 100 ms
//! - [`BroadcastDispatcher`]: fixed binary datagrams over UDP, 10 ms
//!
//! Both follow `IDLE -> (interval elapsed AND peer present) -> SEND -> IDLE`.
//! Nothing is buffered: a packet that cannot go out this tick is never
//! retried, the next tick builds a fresh one.

pub mod tcp_stream;
pub mod udp_stream;

use thiserror::Error;

use crate::assembler::PacketAssembler;

pub use crate::clock::RateGate;
pub use tcp_stream::{PeerListener, PeerStream, StreamDispatcher, TcpPeer, TcpPeerListener};
pub use udp_stream::{
    BroadcastDispatcher, DatagramSink, StationCounter, StationMonitor, UdpDatagramSink,
};

/// What one `dispatch()` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Send interval not elapsed
    NotDue,
    /// No connected peer / no associated station
    NoPeer,
    /// One write of this many bytes
    Sent(usize),
    /// Write attempted and failed; the packet is gone
    Dropped,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent(_))
    }
}

/// Send counters since the last `take()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub sent: u32,
    pub failed: u32,
}

impl TelemetryStats {
    pub(crate) fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent(_) => self.sent = self.sent.wrapping_add(1),
            DispatchOutcome::Dropped => self.failed = self.failed.wrapping_add(1),
            DispatchOutcome::NotDue | DispatchOutcome::NoPeer => {}
        }
    }

    /// Return the counters and reset them to zero
    pub fn take(&mut self) -> TelemetryStats {
        std::mem::take(self)
    }
}

/// One send strategy, driven once per scheduler tick
pub trait TransportDispatcher {
    /// Short label for log lines
    fn name(&self) -> &'static str;

    /// Send one freshly assembled packet if due and a peer is present
    ///
    /// Never blocks waiting for a peer and never returns an error: a failed
    /// write is counted and reported as [`DispatchOutcome::Dropped`].
    fn dispatch(&mut self, now_ms: u32, assembler: &PacketAssembler<'_>) -> DispatchOutcome;

    fn stats(&self) -> TelemetryStats;

    /// Counters since the previous call (periodic rate logging)
    fn take_stats(&mut self) -> TelemetryStats;
}

impl<T: TransportDispatcher + ?Sized> TransportDispatcher for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn dispatch(&mut self, now_ms: u32, assembler: &PacketAssembler<'_>) -> DispatchOutcome {
        (**self).dispatch(now_ms, assembler)
    }

    fn stats(&self) -> TelemetryStats {
        (**self).stats()
    }

    fn take_stats(&mut self) -> TelemetryStats {
        (**self).take_stats()
    }
}

/// Socket setup failures (dispatch itself cannot fail)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}
