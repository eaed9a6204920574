#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use wallbox_bridge::config::Config;
use wallbox_bridge::device::RegisterIo;
use wallbox_bridge::error::DeviceError;
use wallbox_bridge::register::ReadFunction;

/// Scripted bus double: canned responses per (function, address),
/// recorded writes. Unscripted reads answer with zeroed words.
pub struct MockDevice {
    reads: HashMap<(ReadFunction, u16), Result<Vec<u16>, DeviceError>>,
    pub writes: Vec<(u16, u16)>,
    pub fail_writes: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            reads: HashMap::new(),
            writes: Vec::new(),
            fail_writes: false,
        }
    }

    pub fn with_read(mut self, function: ReadFunction, address: u16, words: Vec<u16>) -> Self {
        self.reads.insert((function, address), Ok(words));
        self
    }

    pub fn with_read_error(mut self, function: ReadFunction, address: u16) -> Self {
        self.reads.insert(
            (function, address),
            Err(DeviceError::Read("scripted failure".to_string())),
        );
        self
    }
}

#[async_trait]
impl RegisterIo for MockDevice {
    async fn read_registers(
        &mut self,
        function: ReadFunction,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        self.reads
            .get(&(function, address))
            .cloned()
            .unwrap_or_else(|| Ok(vec![0; count as usize]))
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        if self.fail_writes {
            return Err(DeviceError::Write("scripted failure".to_string()));
        }
        self.writes.push((address, value));
        Ok(())
    }
}

/// Minimal parsed config: both sinks disabled, socket at the given path.
pub fn test_config(socket: &Path) -> Config {
    let yaml = format!(
        r#"
device:
  port: /dev/null
mqtt:
  enabled: false
  host: localhost
influx:
  enabled: false
  url: http://localhost:8086
  database: wallbox
socket: {}
"#,
        socket.display()
    );

    let config: Config = serde_yaml::from_str(&yaml).unwrap();
    config.validate().unwrap();
    config
}
