mod common;
use common::*;

use std::time::Duration;

use wallbox_bridge::config::Config;
use wallbox_bridge::prelude::*;

fn influx_config(url: &str) -> Config {
    let yaml = format!(
        r#"
device:
  port: /dev/null
mqtt:
  enabled: false
  host: localhost
influx:
  url: {}
  database: wallbox
socket: /tmp/wallbox-bridge-test.sock
"#,
        url
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn point() -> influx::Point {
    influx::Point {
        varname: "addr6".to_string(),
        vartype: "input_register",
        raw: 105,
        time: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn batch_is_flushed_in_one_write_call() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", mockito::Matcher::Any)
        .match_query(mockito::Matcher::Any)
        .with_status(204)
        .create_async()
        .await;

    let config = influx_config(&server.url());
    let channels = Channels::new();

    let influx = Influx::new(config, channels.clone());
    let influx_clone = influx.clone();
    let handle = tokio::spawn(async move { influx_clone.start().await });

    // let the sender subscribe before the batch goes out
    tokio::time::sleep(Duration::from_millis(200)).await;

    channels
        .to_influx
        .send(influx::ChannelData::Batch(vec![point(), point()]))?;

    for _ in 0..50 {
        if mock.matched_async().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    mock.assert_async().await;

    influx.stop();
    let _ = handle.await?;

    Ok(())
}

#[tokio::test]
async fn failed_write_is_discarded_and_sender_continues() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", mockito::Matcher::Any)
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .expect_at_least(1)
        .create_async()
        .await;

    let config = influx_config(&server.url());
    let channels = Channels::new();

    let influx = Influx::new(config, channels.clone());
    let influx_clone = influx.clone();
    let handle = tokio::spawn(async move { influx_clone.start().await });

    tokio::time::sleep(Duration::from_millis(200)).await;

    channels
        .to_influx
        .send(influx::ChannelData::Batch(vec![point()]))?;

    for _ in 0..50 {
        if mock.matched_async().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    mock.assert_async().await;

    // the sender survives the failure and still honors shutdown
    influx.stop();
    let result = handle.await?;
    assert!(result.is_ok());

    Ok(())
}
