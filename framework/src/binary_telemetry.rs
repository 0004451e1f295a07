/// Binary telemetry encoding for the Broadcast transport
/// One fixed-layout record per datagram, no header, no sequence number
/// Target: 100 Hz (10 ms intervals) to the PC client
///
/// Layout version 1 (remote gyro-only)
use thiserror::Error;

use crate::remote_link::RemoteSample;
use crate::sensors::{AnalogSample, Bearing, InertialSample, MagneticSample};

/// Current remote-field layout carried in the packet
pub const PACKET_LAYOUT_VERSION: u8 = crate::remote_link::REMOTE_LAYOUT_VERSION;

/// Packet size without remote fields
pub const SINGLE_NODE_PACKET_SIZE: usize = 48;

/// Packet size with remote gyro x/y/z
pub const DUAL_NODE_PACKET_SIZE: usize = 54;

/// Fused telemetry record (built fresh on every dispatch tick)
///
/// Wire layout, little-endian, packed:
/// - ax, ay, az, gx, gy, gz: i16 ×6 (×100 fixed-point)    offset 0
/// - mx, my, mz: i32 ×3                                    offset 12
/// - heading: f32 (degrees)                                offset 24
/// - v32, v33, v34, v35: f32 ×4 (volts)                    offset 28
/// - slave gx, gy, gz: i16 ×3 (dual-node only)             offset 44
/// - timestamp_ms: u32                                     offset 44 or 50
///
/// The bearing label and the temperature never go on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryPacket {
    pub inertial: InertialSample,
    pub magnetic: MagneticSample,
    pub analog: AnalogSample,
    /// `Some` in the dual-node variant (zeros until the first remote message)
    pub remote: Option<RemoteSample>,
    /// Milliseconds since boot
    pub timestamp_ms: u32,
}

/// Encoded packet bytes (fixed buffer, no allocation)
#[derive(Clone, Copy)]
pub struct EncodedPacket {
    buf: [u8; DUAL_NODE_PACKET_SIZE],
    len: usize,
}

impl EncodedPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Errors decoding a received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid packet length {0} (expected 48 or 54 bytes)")]
    InvalidLength(usize),
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }
}

impl TelemetryPacket {
    /// Size of this packet on the wire
    pub fn wire_size(&self) -> usize {
        if self.remote.is_some() {
            DUAL_NODE_PACKET_SIZE
        } else {
            SINGLE_NODE_PACKET_SIZE
        }
    }

    /// Serialize to the fixed wire layout
    pub fn to_bytes(&self) -> EncodedPacket {
        let mut buf = [0u8; DUAL_NODE_PACKET_SIZE];
        let mut w = Writer {
            buf: &mut buf,
            pos: 0,
        };

        let i = &self.inertial;
        for v in [i.ax, i.ay, i.az, i.gx, i.gy, i.gz] {
            w.put(&v.to_le_bytes());
        }

        let m = &self.magnetic;
        for v in [m.mx, m.my, m.mz] {
            w.put(&v.to_le_bytes());
        }
        w.put(&m.heading.to_le_bytes());

        let a = &self.analog;
        for v in [a.v32, a.v33, a.v34, a.v35] {
            w.put(&v.to_le_bytes());
        }

        if let Some(r) = &self.remote {
            for v in [r.gx, r.gy, r.gz] {
                w.put(&v.to_le_bytes());
            }
        }

        w.put(&self.timestamp_ms.to_le_bytes());
        let len = w.pos;

        EncodedPacket { buf, len }
    }

    /// Parse a received datagram (PC side)
    ///
    /// The length selects the variant. The bearing label is not on the wire,
    /// it is derived from the heading.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let dual = match bytes.len() {
            SINGLE_NODE_PACKET_SIZE => false,
            DUAL_NODE_PACKET_SIZE => true,
            n => return Err(DecodeError::InvalidLength(n)),
        };

        let mut r = Reader { buf: bytes, pos: 0 };

        let inertial = InertialSample {
            ax: r.i16(),
            ay: r.i16(),
            az: r.i16(),
            gx: r.i16(),
            gy: r.i16(),
            gz: r.i16(),
            temperature: 0,
        };

        let (mx, my, mz) = (r.i32(), r.i32(), r.i32());
        let heading = r.f32();
        let magnetic = MagneticSample {
            mx,
            my,
            mz,
            heading,
            bearing: Bearing::from_heading(heading),
        };

        let analog = AnalogSample {
            v32: r.f32(),
            v33: r.f32(),
            v34: r.f32(),
            v35: r.f32(),
        };

        let remote = dual.then(|| RemoteSample {
            gx: r.i16(),
            gy: r.i16(),
            gz: r.i16(),
        });

        let timestamp_ms = r.u32();

        Ok(Self {
            inertial,
            magnetic,
            analog,
            remote,
            timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet(remote: Option<RemoteSample>) -> TelemetryPacket {
        TelemetryPacket {
            inertial: InertialSample {
                ax: 100,
                ay: -50,
                az: 98,
                gx: 1,
                gy: -2,
                gz: 3,
                temperature: 3653,
            },
            magnetic: MagneticSample {
                mx: -1200,
                my: 70000,
                mz: 5,
                heading: 90.0,
                bearing: Bearing::E,
            },
            analog: AnalogSample {
                v32: 0.0,
                v33: 1.65,
                v34: 3.3,
                v35: 0.5,
            },
            remote,
            timestamp_ms: 123_456,
        }
    }

    #[test]
    fn test_packet_sizes() {
        assert_eq!(sample_packet(None).to_bytes().as_bytes().len(), SINGLE_NODE_PACKET_SIZE);
        let dual = sample_packet(Some(RemoteSample::default()));
        assert_eq!(dual.to_bytes().as_bytes().len(), DUAL_NODE_PACKET_SIZE);
        assert_eq!(dual.wire_size(), 54);
    }

    #[test]
    fn test_field_offsets() {
        let packet = sample_packet(Some(RemoteSample {
            gx: 0x0A0B,
            gy: -1,
            gz: 7,
        }));
        let encoded = packet.to_bytes();
        let bytes = encoded.as_bytes();

        assert_eq!(&bytes[0..2], &100i16.to_le_bytes());
        assert_eq!(&bytes[2..4], &(-50i16).to_le_bytes());
        assert_eq!(&bytes[12..16], &(-1200i32).to_le_bytes());
        assert_eq!(&bytes[16..20], &70000i32.to_le_bytes());
        assert_eq!(&bytes[24..28], &90.0f32.to_le_bytes());
        assert_eq!(&bytes[32..36], &1.65f32.to_le_bytes());
        assert_eq!(&bytes[44..46], &[0x0B, 0x0A]);
        assert_eq!(&bytes[46..48], &[0xFF, 0xFF]);
        assert_eq!(&bytes[50..54], &123_456u32.to_le_bytes());
    }

    #[test]
    fn test_single_node_timestamp_follows_analog() {
        let encoded = sample_packet(None).to_bytes();
        assert_eq!(&encoded.as_bytes()[44..48], &123_456u32.to_le_bytes());
    }

    #[test]
    fn test_decode_drops_temperature_and_derives_bearing() {
        let mut packet = sample_packet(Some(RemoteSample { gx: 5, gy: 6, gz: 7 }));
        let decoded = TelemetryPacket::from_bytes(packet.to_bytes().as_bytes()).unwrap();

        assert_eq!(decoded.inertial.temperature, 0);
        assert_eq!(decoded.magnetic.bearing, Bearing::E);

        // Everything that is on the wire comes back unchanged
        packet.inertial.temperature = 0;
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_decode_rejects_other_lengths() {
        assert_eq!(
            TelemetryPacket::from_bytes(&[0u8; 60]),
            Err(DecodeError::InvalidLength(60))
        );
        assert_eq!(
            TelemetryPacket::from_bytes(&[]),
            Err(DecodeError::InvalidLength(0))
        );
    }

    #[test]
    fn test_layout_version() {
        assert_eq!(PACKET_LAYOUT_VERSION, 1);
    }
}
