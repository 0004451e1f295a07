//! Motion-capture telemetry link
//!
//! The telemetry pipeline of a two-node wearable motion-capture system.
//! Each node samples local inertial, magnetic and analog sensors; the
//! primary node also receives gyro data from the secondary node over a
//! wireless bridge, fuses both into one fixed-layout packet and pushes it
//! to a PC client at a strict rate. Freshness beats reliability: nothing is
//! retried, nothing is buffered.
//!
//! ## Architecture
//!
//! ```text
//! physical sensor ──► SensorManager ─┐
//!                                    ├─► PacketAssembler ─► TransportDispatcher ─► PC
//! radio callback ─► RemoteLinkBridge ┘        (SchedulerLoop ticks everything)
//! ```
//!
//! Two execution contexts: the cooperative [`scheduler::SchedulerLoop`] and
//! the radio receive context. The only state they share is the
//! [`remote_link::RemoteLinkBridge`], a lock-free per-field atomic cell.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mocap_link::clock::{BootClock, Clock};
//! use mocap_link::config::SystemConfig;
//! use mocap_link::node::{build_dispatcher, PrimaryNode};
//! use mocap_link::sim::{SimulatedAdc, SimulatedCompass, SimulatedImu};
//! use mocap_link::transport::StationCounter;
//!
//! let config = SystemConfig::from_env().expect("invalid build configuration");
//! let stations = StationCounter::new();
//! let dispatcher = build_dispatcher(&config, stations.clone()).expect("socket setup");
//!
//! let mut node = PrimaryNode::new(
//!     &config,
//!     SimulatedImu::new(1),
//!     SimulatedCompass::new(2),
//!     SimulatedAdc::new(3),
//!     dispatcher,
//!     None,
//! );
//! let _ = node.init();
//!
//! let clock = BootClock::new();
//! loop {
//!     node.tick(clock.now_ms());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sensors`] - Sensor capability traits and sample types
//! - [`sensor_manager`] - Interval-gated acquisition with last-known readings
//! - [`remote_link`] - Radio-callback to main-loop handoff
//! - [`binary_telemetry`] - 48/54-byte wire contract
//! - [`transport`] - Streaming (TCP) and Broadcast (UDP) dispatchers
//! - [`node`] - Primary and secondary composition roots

pub mod assembler;
pub mod binary_telemetry;
pub mod clock;
pub mod config;
pub mod node;
pub mod radio;
pub mod remote_link;
pub mod scaling;
pub mod scheduler;
pub mod sensor_manager;
pub mod sensors;
pub mod sim;
pub mod text_telemetry;
pub mod transport;

// Re-export commonly used types
pub use assembler::PacketAssembler;
pub use binary_telemetry::{DecodeError, TelemetryPacket};
pub use config::{ConfigError, SystemConfig, TransportMode};
pub use node::{PrimaryNode, SecondaryNode};
pub use remote_link::{RemoteLinkBridge, RemoteSample};
pub use scheduler::{SchedulerLoop, TickReport};
pub use sensor_manager::{PollOutcome, PolledSensor, SensorManager};
pub use sensors::{AnalogSample, Bearing, InertialSample, MagneticSample, SensorError};
pub use transport::{DispatchOutcome, TransportDispatcher, TransportError};
