//! Wireless bridge between the secondary and primary nodes
//!
//! Connectionless, no acknowledgement, no retry. On the bench the radio is
//! stood in for by UDP datagrams on the loopback or LAN interface; the
//! receive side runs its callback on a dedicated thread, which is the
//! asynchronous execution context the [`RemoteLinkBridge`] is built for.
//!
//! [`RemoteLinkBridge`]: crate::remote_link::RemoteLinkBridge

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

/// Largest payload the link carries in one message
pub const MAX_RADIO_PAYLOAD: usize = 250;

/// How often the receive thread checks for shutdown
const RECEIVE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("radio I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("payload of {0} bytes exceeds the radio frame")]
    PayloadTooLarge(usize),
    #[error("invalid peer address '{0}'")]
    InvalidPeer(String),
}

/// Send side of the bridge
pub trait RadioLink {
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError>;
}

impl<T: RadioLink + ?Sized> RadioLink for Box<T> {
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        (**self).send(payload)
    }
}

/// Datagram radio towards one configured peer
pub struct UdpRadioLink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpRadioLink {
    pub fn open(local: &str, peer: &str) -> Result<Self, RadioError> {
        let peer = peer
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| RadioError::InvalidPeer(peer.to_string()))?;

        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        info!("Radio link up, peer {}", peer);

        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl RadioLink for UdpRadioLink {
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > MAX_RADIO_PAYLOAD {
            return Err(RadioError::PayloadTooLarge(payload.len()));
        }
        self.socket.send_to(payload, self.peer)?;
        Ok(())
    }
}

/// Handle to a running receive thread
pub struct RadioReceiver {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RadioReceiver {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Radio receive thread panicked");
            }
        }
    }
}

impl Drop for RadioReceiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Listen on `bind` and call `on_message` for every received payload
///
/// The callback runs on the receive thread and must stay short: no
/// blocking, no sensor bus access.
pub fn spawn_receiver<F>(bind: &str, on_message: F) -> Result<RadioReceiver, RadioError>
where
    F: Fn(&[u8]) + Send + 'static,
{
    let socket = UdpSocket::bind(bind)?;
    socket.set_read_timeout(Some(RECEIVE_POLL))?;
    let local_addr = socket.local_addr()?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);

    let handle = thread::Builder::new()
        .name("radio-rx".into())
        .spawn(move || {
            let mut buf = [0u8; MAX_RADIO_PAYLOAD];
            while flag.load(Ordering::SeqCst) {
                match socket.recv_from(&mut buf) {
                    Ok((n, _from)) => on_message(&buf[..n]),
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                        ) => {}
                    Err(e) => debug!("radio receive error: {}", e),
                }
            }
        })?;

    info!("Radio receiver listening on {}", local_addr);
    Ok(RadioReceiver {
        local_addr,
        running,
        handle: Some(handle),
    })
}
