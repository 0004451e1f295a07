//! Line-oriented text records for the Streaming transport
//!
//! One JSON object per line, grouped by sensor:
//!
//! ```text
//! {"gyro":{"ax":1.0,...,"gz":0.0},"mag":{"mx":..,"heading":..,"bearing":"NE"},"adc":{"v32":..}}\n
//! ```
//!
//! Inertial fields are rendered in physical units (fixed-point / 100).
//! Consumers split the stream on `'\n'`.

use serde::Serialize;

use crate::binary_telemetry::TelemetryPacket;
use crate::scaling::FIXED_POINT_SCALE;
use crate::sensors::Bearing;

#[derive(Serialize)]
struct GyroGroup {
    ax: f64,
    ay: f64,
    az: f64,
    gx: f64,
    gy: f64,
    gz: f64,
}

#[derive(Serialize)]
struct MagGroup {
    mx: i32,
    my: i32,
    mz: i32,
    heading: f32,
    bearing: Bearing,
}

#[derive(Serialize)]
struct AdcGroup {
    v32: f32,
    v33: f32,
    v34: f32,
    v35: f32,
}

#[derive(Serialize)]
struct SlaveGroup {
    gx: f64,
    gy: f64,
    gz: f64,
}

#[derive(Serialize)]
struct StreamRecord {
    gyro: GyroGroup,
    mag: MagGroup,
    adc: AdcGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    slave: Option<SlaveGroup>,
}

fn physical(value: i16) -> f64 {
    value as f64 / FIXED_POINT_SCALE as f64
}

impl From<&TelemetryPacket> for StreamRecord {
    fn from(p: &TelemetryPacket) -> Self {
        Self {
            gyro: GyroGroup {
                ax: physical(p.inertial.ax),
                ay: physical(p.inertial.ay),
                az: physical(p.inertial.az),
                gx: physical(p.inertial.gx),
                gy: physical(p.inertial.gy),
                gz: physical(p.inertial.gz),
            },
            mag: MagGroup {
                mx: p.magnetic.mx,
                my: p.magnetic.my,
                mz: p.magnetic.mz,
                heading: p.magnetic.heading,
                bearing: p.magnetic.bearing,
            },
            adc: AdcGroup {
                v32: p.analog.v32,
                v33: p.analog.v33,
                v34: p.analog.v34,
                v35: p.analog.v35,
            },
            slave: p.remote.map(|r| SlaveGroup {
                gx: physical(r.gx),
                gy: physical(r.gy),
                gz: physical(r.gz),
            }),
        }
    }
}

/// Render one newline-terminated text record
pub fn render_record(packet: &TelemetryPacket) -> String {
    let record = StreamRecord::from(packet);
    // Plain numbers and strings only, serialization cannot fail
    let mut line = serde_json::to_string(&record).unwrap_or_default();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_link::RemoteSample;
    use crate::sensors::{AnalogSample, InertialSample, MagneticSample};
    use serde_json::Value;

    fn packet() -> TelemetryPacket {
        TelemetryPacket {
            inertial: InertialSample {
                ax: 100,
                ay: -50,
                az: 0,
                gx: 250,
                gy: 0,
                gz: -1,
                temperature: 3653,
            },
            magnetic: MagneticSample {
                mx: -12,
                my: 34,
                mz: 56,
                heading: 45.0,
                bearing: Bearing::NE,
            },
            analog: AnalogSample {
                v32: 0.5,
                v33: 1.0,
                v34: 2.0,
                v35: 3.25,
            },
            remote: None,
            timestamp_ms: 1000,
        }
    }

    #[test]
    fn test_record_is_single_line() {
        let line = render_record(&packet());
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_record_groups_and_values() {
        let line = render_record(&packet());
        let v: Value = serde_json::from_str(line.trim_end()).unwrap();

        assert_eq!(v["gyro"]["ax"], 1.0);
        assert_eq!(v["gyro"]["ay"], -0.5);
        assert_eq!(v["gyro"]["gx"], 2.5);
        assert_eq!(v["gyro"]["gz"], -0.01);
        assert_eq!(v["mag"]["mx"], -12);
        assert_eq!(v["mag"]["heading"], 45.0);
        assert_eq!(v["mag"]["bearing"], "NE");
        assert_eq!(v["adc"]["v35"], 3.25);
        assert!(v.get("slave").is_none());
    }

    #[test]
    fn test_group_order() {
        let line = render_record(&packet());
        let gyro = line.find("\"gyro\"").unwrap();
        let mag = line.find("\"mag\"").unwrap();
        let adc = line.find("\"adc\"").unwrap();
        assert!(gyro < mag && mag < adc);
    }

    #[test]
    fn test_temperature_not_rendered() {
        let line = render_record(&packet());
        assert!(!line.contains("temp"));
    }

    #[test]
    fn test_dual_node_adds_slave_group() {
        let mut p = packet();
        p.remote = Some(RemoteSample { gx: 100, gy: 0, gz: -300 });
        let v: Value = serde_json::from_str(render_record(&p).trim_end()).unwrap();
        assert_eq!(v["slave"]["gx"], 1.0);
        assert_eq!(v["slave"]["gz"], -3.0);
    }
}
