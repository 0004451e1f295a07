//! Remote sample handoff from the radio receive context to the main loop
//!
//! The secondary node sends one [`RemoteSample`] per message. The radio
//! capability calls [`RemoteLinkBridge::on_receive`] from its own execution
//! context (callback thread or interrupt-like handler); the scheduler reads
//! [`RemoteLinkBridge::latest`] from the cooperative loop.
//!
//! Sharing discipline:
//! - the receive context is the only writer, the loop is the only reader
//! - every field is its own atomic, replaced whole (never torn)
//! - no lock: a read may mix axes from two consecutive messages if one lands
//!   mid-read. That cross-field tearing is accepted.

use std::sync::atomic::{AtomicI16, Ordering};

use log::trace;

/// Version of the remote message layout (gyro x/y/z only)
pub const REMOTE_LAYOUT_VERSION: u8 = 1;

/// Size in bytes of one remote message: 3 × i16, little-endian
pub const REMOTE_SAMPLE_SIZE: usize = 6;

/// Gyroscope axes from the secondary node, ×100 fixed-point deg/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteSample {
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
}

impl RemoteSample {
    /// Serialize to the radio message layout
    pub fn encode(&self) -> [u8; REMOTE_SAMPLE_SIZE] {
        let mut buf = [0u8; REMOTE_SAMPLE_SIZE];
        buf[0..2].copy_from_slice(&self.gx.to_le_bytes());
        buf[2..4].copy_from_slice(&self.gy.to_le_bytes());
        buf[4..6].copy_from_slice(&self.gz.to_le_bytes());
        buf
    }

    /// Parse a radio message; `None` unless exactly `REMOTE_SAMPLE_SIZE` bytes
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() != REMOTE_SAMPLE_SIZE {
            return None;
        }
        Some(Self {
            gx: i16::from_le_bytes([payload[0], payload[1]]),
            gy: i16::from_le_bytes([payload[2], payload[3]]),
            gz: i16::from_le_bytes([payload[4], payload[5]]),
        })
    }
}

/// Latest remote sample, shared between the receive context and the loop
///
/// Wrap in `Arc` and hand one clone to the radio receive callback.
#[derive(Debug, Default)]
pub struct RemoteLinkBridge {
    gx: AtomicI16,
    gy: AtomicI16,
    gz: AtomicI16,
}

impl RemoteLinkBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive-context entry point
    ///
    /// Short and non-blocking. A payload of the wrong size is dropped
    /// silently and leaves every field untouched. Returns whether the
    /// payload was accepted.
    pub fn on_receive(&self, payload: &[u8]) -> bool {
        let Some(sample) = RemoteSample::decode(payload) else {
            trace!("Dropping {} byte remote payload", payload.len());
            return false;
        };

        // Relaxed: each field is independent, no ordering between them
        self.gx.store(sample.gx, Ordering::Relaxed);
        self.gy.store(sample.gy, Ordering::Relaxed);
        self.gz.store(sample.gz, Ordering::Relaxed);
        true
    }

    /// Loop-context read of the most recent values (zeros until the first message)
    pub fn latest(&self) -> RemoteSample {
        RemoteSample {
            gx: self.gx.load(Ordering::Relaxed),
            gy: self.gy.load(Ordering::Relaxed),
            gz: self.gz.load(Ordering::Relaxed),
        }
    }
}
