use crate::prelude::*;

use chrono::Utc;
use std::time::Duration;

use crate::register::{RegisterEntry, WriteRegister, WriteValue};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChannelData {
    Shutdown,
}

/// The poll loop. Owns the bus connection exclusively; every cycle it
/// walks the register table in order, forwards decoded reads to both
/// sinks and issues the writes, including the one externally commanded
/// charge-current setpoint.
#[derive(Clone)]
pub struct Coordinator {
    config: Config,
    channels: Channels,
    slot: Slot,
}

impl Coordinator {
    pub fn new(config: Config, channels: Channels, slot: Slot) -> Self {
        Self {
            config,
            channels,
            slot,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut device = Device::connect(self.config.device())
            .map_err(|err| anyhow!("{}: {}", self.config.device().port(), err))?;
        info!("RS485 modbus connection established");

        let mut shutdown = self.channels.to_coordinator.subscribe();
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval()));

        loop {
            tokio::select! {
                _ = interval.tick() => self.run_cycle(&mut device).await,
                message = shutdown.recv() => {
                    if matches!(message, Ok(ChannelData::Shutdown) | Err(_)) {
                        info!("coordinator shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_coordinator.send(ChannelData::Shutdown);
    }

    /// One pass over the register table. Errors in here are contained to
    /// their own entry; the cycle always runs to the end, and the batch
    /// is flushed in one call whatever happened before it.
    pub async fn run_cycle(&self, io: &mut dyn RegisterIo) {
        let cycle_start = Utc::now();
        let mut batch = Vec::new();

        for entry in register::TABLE {
            match entry {
                RegisterEntry::Read(reg) => {
                    match io
                        .read_registers(reg.function, reg.address, reg.words as u16)
                        .await
                    {
                        Ok(words) => {
                            let sample = reg.decode(&words, cycle_start);
                            match sample.legend {
                                Some(legend) => {
                                    debug!("{:<30} {} ({})", reg.name, sample.raw, legend)
                                }
                                None => debug!("{:<30} {}", reg.name, sample.value),
                            }

                            let _ = self.channels.to_mqtt.send(mqtt::ChannelData::Message(
                                mqtt::Message::for_sample(&sample),
                            ));
                            batch.push(influx::Point::for_sample(&sample));
                        }
                        Err(err) => warn!("{} (register {}): {}", reg.name, reg.address, err),
                    }
                }
                RegisterEntry::Write(reg) => self.write_entry(io, reg).await,
            }
        }

        if !batch.is_empty() {
            let _ = self
                .channels
                .to_influx
                .send(influx::ChannelData::Batch(batch));
        }
    }

    async fn write_entry(&self, io: &mut dyn RegisterIo, reg: &WriteRegister) {
        let value = match reg.value {
            WriteValue::Static(value) => Some(value),
            // take-and-clear: an admitted setpoint reaches the bus at most once
            WriteValue::Setpoint => self.slot.take(),
        };

        let Some(value) = value else { return };

        match io.write_register(reg.address, value).await {
            Ok(()) => {
                if reg.value == WriteValue::Setpoint {
                    info!("charge current updated to {:.1} A", f64::from(value) / 10.0);
                }
            }
            Err(err) => warn!("{} (register {}): {}", reg.name, reg.address, err),
        }
    }
}
