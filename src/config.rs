use crate::prelude::*;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub device: Device,
    pub mqtt: Mqtt,
    pub influx: Influx,

    #[serde(default = "Config::default_socket")]
    pub socket: String,

    /// Poll cycle period in seconds, measured from cycle start.
    #[serde(default = "Config::default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Device {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Device {
    #[serde(default = "Config::default_device_port")]
    pub port: String,

    #[serde(default = "Config::default_baudrate")]
    pub baudrate: u32,

    /// "even" (wallbox default), "odd" or "none"; 8 data bits, 1 stop bit.
    #[serde(default = "Config::default_parity")]
    pub parity: String,

    #[serde(default = "Config::default_unit_id")]
    pub unit_id: u8,

    #[serde(default = "Config::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Device {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    pub fn parity(&self) -> &str {
        &self.parity
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_namespace")]
    pub namespace: String,
}

impl Mqtt {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
} // }}}

// Influx {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,

    pub database: String,
}

impl Influx {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
} // }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Called once the logger is up; Config::new runs before it is.
    pub fn log_summary(&self) {
        info!("  device: {} @ {} 8{}1, unit {}",
            self.device.port,
            self.device.baudrate,
            self.device.parity.chars().next().unwrap_or('e').to_ascii_uppercase(),
            self.device.unit_id
        );
        info!("  socket: {}", self.socket);
        info!("  mqtt: {}", if self.mqtt.enabled { "enabled" } else { "disabled" });
        if self.mqtt.enabled {
            info!("    host: {}:{}", self.mqtt.host, self.mqtt.port);
            info!("    namespace: {}", self.mqtt.namespace);
        }
        info!("  influx: {}", if self.influx.enabled { "enabled" } else { "disabled" });
        if self.influx.enabled {
            info!("    url: {}", self.influx.url);
            info!("    database: {}", self.influx.database);
        }
        info!("  poll interval: {}s", self.poll_interval);
        info!("  log level: {}", self.loglevel);
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.port.is_empty() {
            bail!("device.port cannot be empty");
        }
        if self.device.baudrate == 0 {
            bail!("device.baudrate must be non-zero");
        }
        if self.device.timeout_ms == 0 {
            bail!("device.timeout_ms must be non-zero");
        }

        if self.socket.is_empty() {
            bail!("socket path cannot be empty");
        }

        if self.poll_interval == 0 {
            bail!("poll_interval must be at least 1 second");
        }

        if self.mqtt.enabled {
            if self.mqtt.port == 0 {
                bail!("mqtt.port must be between 1 and 65535");
            }
            if self.mqtt.host.is_empty() {
                bail!("mqtt.host cannot be empty");
            }
        }

        if self.influx.enabled {
            if let Err(e) = url::Url::parse(&self.influx.url) {
                bail!("invalid influx URL: {}", e);
            }
            if self.influx.database.is_empty() {
                bail!("influx.database cannot be empty");
            }
        }

        Ok(())
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn mqtt(&self) -> &Mqtt {
        &self.mqtt
    }

    pub fn influx(&self) -> &Influx {
        &self.influx
    }

    pub fn socket_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.socket)
    }

    pub fn poll_interval(&self) -> u64 {
        self.poll_interval
    }

    pub fn loglevel(&self) -> String {
        self.loglevel.clone()
    }

    fn default_socket() -> String {
        "/run/wallbox-bridge/wallbox-bridge.sock".to_string()
    }

    fn default_poll_interval() -> u64 {
        2
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_device_port() -> String {
        "/dev/ttyUSB0".to_string()
    }

    fn default_baudrate() -> u32 {
        19200
    }

    fn default_parity() -> String {
        "even".to_string()
    }

    fn default_unit_id() -> u8 {
        1
    }

    fn default_timeout_ms() -> u64 {
        1000
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_namespace() -> String {
        "wallbox".to_string()
    }
}
