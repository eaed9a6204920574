use crate::prelude::*;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use std::time::Duration;

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    /// Topic and payload for one decoded sample. The namespace prefix is
    /// added by the sender; the payload is the scaled value, legend-less,
    /// matching what consumers on the bus already parse.
    pub fn for_sample(sample: &register::Sample) -> Message {
        Message {
            topic: format!("addr{}", sample.address),
            retain: false,
            payload: format!("{:.6}", sample.value),
        }
    }
} // }}}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Message(Message),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

#[derive(Clone)]
pub struct Mqtt {
    config: Config,
    channels: Channels,
}

impl Mqtt {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let c = &self.config;

        if !c.mqtt().enabled() {
            info!("mqtt disabled, skipping");
            return Ok(());
        }

        let mut options = MqttOptions::new("wallbox-bridge", c.mqtt().host(), c.mqtt().port());

        let will = LastWill {
            topic: self.lwt_topic(),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(u), Some(p)) = (c.mqtt().username(), c.mqtt().password()) {
            options.set_credentials(u.clone(), p.clone());
        }

        info!(
            "initializing mqtt at {}:{}",
            c.mqtt().host(),
            c.mqtt().port()
        );

        let (client, eventloop) = AsyncClient::new(options, 10);

        futures::try_join!(self.setup(client.clone()), self.receiver(eventloop), self.sender(client))?;

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let _ = self.channels.to_mqtt.send(ChannelData::Shutdown);
        Ok(())
    }

    async fn setup(&self, client: AsyncClient) -> Result<()> {
        client
            .publish(self.lwt_topic(), QoS::AtLeastOnce, true, "online")
            .await?;

        Ok(())
    }

    // nothing subscribes to anything; this still has to drive the event
    // loop so publishes, acks and keepalives go out.
    async fn receiver(&self, mut eventloop: EventLoop) -> Result<()> {
        let mut channel = self.channels.to_mqtt.subscribe();

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => info!("mqtt connected"),
                    Ok(_) => {} // acks, keepalives
                    Err(e) => {
                        error!("{}", e);
                        info!("reconnecting in 5s");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                },
                message = channel.recv() => {
                    if matches!(message, Ok(ChannelData::Shutdown) | Err(_)) {
                        info!("mqtt receiver shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    // coordinator -> broker
    async fn sender(&self, client: AsyncClient) -> Result<()> {
        use ChannelData::*;

        let mut receiver = self.channels.to_mqtt.subscribe();

        loop {
            match receiver.recv().await? {
                Shutdown => {
                    let _ = client.disconnect().await;
                    break;
                }
                Message(message) => {
                    let topic = format!("{}/{}", self.config.mqtt().namespace(), message.topic);
                    debug!("publishing: {} = {}", topic, message.payload);

                    // fire and forget; a lost sample is replaced two seconds later
                    if let Err(err) = client
                        .publish(&topic, QoS::AtLeastOnce, message.retain, message.payload)
                        .await
                    {
                        error!("mqtt publish to {} failed: {}", topic, err);
                    }
                }
            }
        }

        info!("mqtt sender loop exiting");

        Ok(())
    }

    fn lwt_topic(&self) -> String {
        format!("{}/LWT", self.config.mqtt().namespace())
    }
}
