/// Configuration for the motion-capture nodes
/// Fixed at build time: defaults below, overridable with `option_env!`
use thiserror::Error;

/// Which transport strategy the primary node runs
/// Default: Broadcast (100 Hz binary datagrams)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Text records over TCP, one client at a time
    Streaming,
    /// Fixed binary packets over UDP
    #[default]
    Broadcast,
}

impl TransportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "stream" | "streaming" | "tcp" => Some(TransportMode::Streaming),
            "broadcast" | "udp" | "binary" => Some(TransportMode::Broadcast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Streaming => "streaming",
            TransportMode::Broadcast => "broadcast",
        }
    }
}

/// Access point and PC client addressing
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name the primary node creates
    pub wifi_ssid: &'static str,
    /// WPA2 passphrase (empty for an open network)
    pub wifi_password: &'static str,
    /// PC address: the first DHCP lease on the access point
    pub pc_host: &'static str,
    /// Stream listen port and broadcast destination port
    pub telemetry_port: u16,
    /// Fixed local port of the Broadcast socket
    pub broadcast_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: "MocapGlove",
            wifi_password: "mocap1234",
            pc_host: "192.168.4.2",
            telemetry_port: 8888,
            broadcast_port: 8889,
        }
    }
}

impl NetworkConfig {
    /// Listen address for the Streaming transport
    pub fn stream_bind(&self) -> String {
        format!("0.0.0.0:{}", self.telemetry_port)
    }

    /// Local address of the Broadcast socket
    pub fn broadcast_bind(&self) -> String {
        format!("0.0.0.0:{}", self.broadcast_port)
    }

    /// Destination for Broadcast datagrams
    pub fn pc_address(&self) -> String {
        format!("{}:{}", self.pc_host, self.telemetry_port)
    }
}

/// Send cadence per transport
#[derive(Debug, Clone, Copy)]
pub struct TelemetryConfig {
    pub stream_interval_ms: u32,
    pub broadcast_interval_ms: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stream_interval_ms: 100,   // 10 Hz
            broadcast_interval_ms: 10, // 100 Hz
        }
    }
}

impl TelemetryConfig {
    pub fn interval_for(&self, mode: TransportMode) -> u32 {
        match mode {
            TransportMode::Streaming => self.stream_interval_ms,
            TransportMode::Broadcast => self.broadcast_interval_ms,
        }
    }
}

/// Sensor poll intervals
#[derive(Debug, Clone, Copy)]
pub struct SensorConfig {
    /// Slow profile, paired with the Streaming transport
    pub slow_poll_ms: u32,
    /// High-rate profile (0 = every tick), paired with Broadcast
    pub fast_poll_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            slow_poll_ms: 250,
            fast_poll_ms: 0,
        }
    }
}

impl SensorConfig {
    pub fn poll_interval_for(&self, mode: TransportMode) -> u32 {
        match mode {
            TransportMode::Streaming => self.slow_poll_ms,
            TransportMode::Broadcast => self.fast_poll_ms,
        }
    }
}

/// Wireless bridge between the two nodes
#[derive(Debug, Clone)]
pub struct RadioConfig {
    /// Primary node expects a secondary node (54-byte packets)
    pub dual_node: bool,
    pub channel: u8,
    /// Primary node radio address, targeted by the secondary node
    pub peer_mac: [u8; 6],
    /// Receive address on the primary node
    pub bind: &'static str,
    /// Primary node address as seen from the secondary node
    pub peer: &'static str,
    /// Secondary node send cadence
    pub send_interval_ms: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            dual_node: false,
            channel: 1,
            peer_mac: [0x6C, 0xC8, 0x40, 0x8B, 0x40, 0xD1],
            bind: "0.0.0.0:8890",
            peer: "127.0.0.1:8890",
            send_interval_ms: 10,
        }
    }
}

impl RadioConfig {
    pub fn peer_mac_string(&self) -> String {
        self.peer_mac
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Master system configuration
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub transport: TransportMode,
    pub network: NetworkConfig,
    pub telemetry: TelemetryConfig,
    pub sensors: SensorConfig,
    pub radio: RadioConfig,
}

impl SystemConfig {
    /// Defaults with compile-time environment overrides
    ///
    /// ```bash
    /// export TRANSPORT_MODE="streaming"     # or "broadcast" (default)
    /// export WIFI_SSID="MyGlove"
    /// export WIFI_PASSWORD="secret123"
    /// export PC_ADDRESS="192.168.4.2"
    /// export TELEMETRY_PORT="8888"
    /// export BROADCAST_PORT="8889"
    /// export DUAL_NODE="1"
    /// export RADIO_BIND="0.0.0.0:8890"
    /// export RADIO_PEER="192.168.4.1:8890"
    /// export SEND_INTERVAL_MS="15"          # active transport only
    /// cargo build --release
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_overrides(|key| match key {
            "TRANSPORT_MODE" => option_env!("TRANSPORT_MODE"),
            "WIFI_SSID" => option_env!("WIFI_SSID"),
            "WIFI_PASSWORD" => option_env!("WIFI_PASSWORD"),
            "PC_ADDRESS" => option_env!("PC_ADDRESS"),
            "TELEMETRY_PORT" => option_env!("TELEMETRY_PORT"),
            "BROADCAST_PORT" => option_env!("BROADCAST_PORT"),
            "DUAL_NODE" => option_env!("DUAL_NODE"),
            "RADIO_BIND" => option_env!("RADIO_BIND"),
            "RADIO_PEER" => option_env!("RADIO_PEER"),
            "SEND_INTERVAL_MS" => option_env!("SEND_INTERVAL_MS"),
            _ => None,
        })
    }

    /// Apply overrides from `lookup` on top of the defaults, then validate
    pub fn with_overrides<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<&'static str>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("TRANSPORT_MODE") {
            config.transport = TransportMode::parse(mode).ok_or(ConfigError::InvalidValue {
                key: "TRANSPORT_MODE",
                value: mode.to_string(),
            })?;
        }
        if let Some(ssid) = lookup("WIFI_SSID") {
            config.network.wifi_ssid = ssid;
        }
        if let Some(password) = lookup("WIFI_PASSWORD") {
            config.network.wifi_password = password;
        }
        if let Some(host) = lookup("PC_ADDRESS") {
            config.network.pc_host = host;
        }
        if let Some(port) = lookup("TELEMETRY_PORT") {
            config.network.telemetry_port = parse_number("TELEMETRY_PORT", port)?;
        }
        if let Some(port) = lookup("BROADCAST_PORT") {
            config.network.broadcast_port = parse_number("BROADCAST_PORT", port)?;
        }
        if let Some(flag) = lookup("DUAL_NODE") {
            config.radio.dual_node = parse_flag("DUAL_NODE", flag)?;
        }
        if let Some(bind) = lookup("RADIO_BIND") {
            config.radio.bind = bind;
        }
        if let Some(peer) = lookup("RADIO_PEER") {
            config.radio.peer = peer;
        }
        if let Some(interval) = lookup("SEND_INTERVAL_MS") {
            let interval = parse_number("SEND_INTERVAL_MS", interval)?;
            match config.transport {
                TransportMode::Streaming => config.telemetry.stream_interval_ms = interval,
                TransportMode::Broadcast => config.telemetry.broadcast_interval_ms = interval,
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the radio or access point would refuse
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssid_len = self.network.wifi_ssid.len();
        if ssid_len == 0 || ssid_len > 32 {
            return Err(ConfigError::Invalid("SSID must be 1-32 bytes"));
        }
        let pass_len = self.network.wifi_password.len();
        if pass_len != 0 && !(8..=63).contains(&pass_len) {
            return Err(ConfigError::Invalid("password must be empty or 8-63 bytes"));
        }
        if self.network.telemetry_port == 0 {
            return Err(ConfigError::Invalid("telemetry port must be non-zero"));
        }
        if self.network.broadcast_port == 0 {
            return Err(ConfigError::Invalid("broadcast port must be non-zero"));
        }
        if !(1..=13).contains(&self.radio.channel) {
            return Err(ConfigError::Invalid("radio channel must be 1-13"));
        }
        if self.telemetry.interval_for(self.transport) == 0 {
            return Err(ConfigError::Invalid("send interval must be at least 1 ms"));
        }
        if self.radio.send_interval_ms == 0 {
            return Err(ConfigError::Invalid("radio send interval must be at least 1 ms"));
        }
        Ok(())
    }

    /// Send interval of the selected transport
    pub fn send_interval_ms(&self) -> u32 {
        self.telemetry.interval_for(self.transport)
    }

    /// Sensor poll interval paired with the selected transport
    pub fn poll_interval_ms(&self) -> u32 {
        self.sensors.poll_interval_for(self.transport)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
