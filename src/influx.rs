use crate::prelude::*;

use chrono::{DateTime, Utc};
use rinfluxdb::line_protocol::{r#async::Client, LineBuilder};

static MEASUREMENT: &str = "wallbox";

/// One raw register reading bound for the time-series store.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub varname: String,
    pub vartype: &'static str,
    pub raw: u32,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn for_sample(sample: &register::Sample) -> Point {
        Point {
            varname: format!("addr{}", sample.address),
            vartype: sample.function.vartype(),
            raw: sample.raw,
            time: sample.time,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    /// One poll cycle's worth of points, flushed in a single write.
    Batch(Vec<Point>),
    Shutdown,
}

#[derive(Clone)]
pub struct Influx {
    config: Config,
    channels: Channels,
}

impl Influx {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.influx().enabled() {
            info!("influx disabled, skipping");
            return Ok(());
        }

        info!("initializing influx at {}", self.config.influx().url());

        let client = {
            let config = self.config.influx();
            let url = reqwest::Url::parse(config.url())?;
            let credentials = match (config.username(), config.password()) {
                (Some(u), Some(p)) => Some((u.clone(), p.clone())),
                _ => None,
            };

            Client::new(url, credentials)?
        };

        self.sender(client).await
    }

    pub fn stop(&self) {
        let _ = self.channels.to_influx.send(ChannelData::Shutdown);
    }

    async fn sender(&self, client: Client) -> Result<()> {
        use ChannelData::*;

        let mut receiver = self.channels.to_influx.subscribe();

        loop {
            match receiver.recv().await {
                Ok(Shutdown) => {
                    info!("influx sender received shutdown signal");
                    break;
                }
                Ok(Batch(points)) => {
                    let lines: Vec<_> = points
                        .iter()
                        .map(|point| {
                            LineBuilder::new(MEASUREMENT)
                                .insert_tag("varname", point.varname.as_str())
                                .insert_tag("vartype", point.vartype)
                                .insert_field("value", point.raw as f64)
                                .set_timestamp(point.time)
                                .build()
                        })
                        .collect();

                    trace!("sending to influx: {:?}", lines);

                    // a failed write drops this cycle's batch; the next
                    // cycle starts from scratch
                    match client.send(&self.database(), &lines).await {
                        Ok(_) => debug!("sent {} points to influx", lines.len()),
                        Err(err) => {
                            error!("influx write failed, dropping {} points: {:?}", lines.len(), err)
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
                Err(e) => {
                    error!("error receiving from influx channel: {}", e);
                }
            }
        }

        info!("influx sender loop exiting");

        Ok(())
    }

    fn database(&self) -> String {
        self.config.influx().database().to_string()
    }
}
