/// Streaming strategy: text records to at most one TCP client
///
/// The node listens; the PC connects. A new connection replaces the current
/// one (no multiplexing). Sockets stay non-blocking end to end: a record
/// the kernel cannot take whole in one write loses the peer instead of
/// stalling the loop.
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use log::{debug, info, warn};

use super::{DispatchOutcome, TelemetryStats, TransportDispatcher, TransportError};
use crate::assembler::PacketAssembler;
use crate::clock::RateGate;
use crate::text_telemetry::render_record;

/// One connected downstream client
pub trait PeerStream {
    /// Write one whole record without waiting
    ///
    /// Anything short of the full record is an error.
    fn write_record(&mut self, data: &[u8]) -> io::Result<()>;

    /// Forcibly disconnect
    fn close(&mut self);
}

/// Source of new client connections, checked without blocking
pub trait PeerListener {
    type Peer: PeerStream;

    /// A connection that arrived since the last call, if any
    fn accept_pending(&mut self) -> Option<Self::Peer>;
}

/// Connected TCP client
pub struct TcpPeer {
    stream: TcpStream,
    addr: SocketAddr,
}

impl TcpPeer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl PeerStream for TcpPeer {
    fn write_record(&mut self, data: &[u8]) -> io::Result<()> {
        // WouldBlock surfaces as an error: a full send buffer means a
        // client that stopped reading
        let written = self.stream.write(data)?;
        if written < data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, data.len()),
            ));
        }
        Ok(())
    }

    fn close(&mut self) {
        // Peer may already be gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Non-blocking TCP listener
pub struct TcpPeerListener {
    listener: TcpListener,
}

impl TcpPeerListener {
    pub fn bind(addr: &str) -> Result<Self, TransportError> {
        info!("Starting telemetry stream server on {}", addr);

        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

impl PeerListener for TcpPeerListener {
    type Peer = TcpPeer;

    fn accept_pending(&mut self) -> Option<TcpPeer> {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                let configured = stream
                    .set_nonblocking(true)
                    .and_then(|_| stream.set_nodelay(true));
                if let Err(e) = configured {
                    warn!("Rejecting client {}: {}", addr, e);
                    return None;
                }
                Some(TcpPeer { stream, addr })
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                debug!("accept failed: {}", e);
                None
            }
        }
    }
}

/// Streaming dispatcher over any [`PeerListener`]
pub struct StreamDispatcher<L: PeerListener> {
    listener: L,
    peer: Option<L::Peer>,
    peer_lost: bool,
    gate: RateGate,
    stats: TelemetryStats,
}

impl<L: PeerListener> StreamDispatcher<L> {
    pub fn new(listener: L, send_interval_ms: u32) -> Self {
        Self {
            listener,
            peer: None,
            peer_lost: false,
            gate: RateGate::new(send_interval_ms),
            stats: TelemetryStats::default(),
        }
    }

    /// Drop a lost peer, then take over any pending connection
    ///
    /// A new connection always wins: the current peer is closed first.
    /// Returns whether a new peer was accepted.
    pub fn accept_if_new(&mut self) -> bool {
        if self.peer_lost {
            if let Some(mut old) = self.peer.take() {
                old.close();
            }
            self.peer_lost = false;
            info!("Stream client disconnected");
        }

        let Some(incoming) = self.listener.accept_pending() else {
            return false;
        };

        if let Some(mut old) = self.peer.take() {
            info!("New stream client, closing previous one");
            old.close();
        } else {
            info!("Stream client connected");
        }
        self.peer = Some(incoming);
        true
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some() && !self.peer_lost
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }
}

impl<L: PeerListener> TransportDispatcher for StreamDispatcher<L> {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn dispatch(&mut self, now_ms: u32, assembler: &PacketAssembler<'_>) -> DispatchOutcome {
        self.accept_if_new();

        // Peer first: the interval only runs while someone is listening
        if !self.has_peer() {
            return DispatchOutcome::NoPeer;
        }
        if !self.gate.try_fire(now_ms) {
            return DispatchOutcome::NotDue;
        }

        let record = render_record(&assembler.assemble(now_ms));
        let outcome = match self.peer.as_mut().map(|p| p.write_record(record.as_bytes())) {
            Some(Ok(())) => DispatchOutcome::Sent(record.len()),
            Some(Err(e)) => {
                debug!("Stream write failed, peer lost: {}", e);
                self.peer_lost = true;
                DispatchOutcome::Dropped
            }
            None => DispatchOutcome::NoPeer,
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
