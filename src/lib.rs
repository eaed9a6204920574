pub mod channels; // coordinator -> sink broadcast channels
pub mod command; // command-channel grammar and one-shot client
pub mod config; // configuration management
pub mod coordinator; // the poll loop
pub mod device; // modbus RTU transaction client
pub mod error; // error types
pub mod influx; // InfluxDB sink adapter
pub mod mqtt; // MQTT sink adapter
pub mod options; // command line options parsing
pub mod prelude; // common imports
pub mod register; // register table and decode engine
pub mod setpoint; // pending charge-current slot
pub mod socket; // command channel server

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

/// Daemon entry point: load config, set up logging and signal handling,
/// then hand over to [`app`].
pub async fn run(config_file: String) -> Result<()> {
    // config errors are fatal before anything else starts; the logger
    // needs the configured level, so report these on stderr directly
    let config = match Config::new(config_file.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config {}: {:?}", config_file, err);
            std::process::exit(255);
        }
    };

    init_logging(&config.loglevel());

    info!("wallbox-bridge {} starting with config file: {}", CARGO_PKG_VERSION, config_file);
    config.log_summary();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    app(shutdown_rx, config).await
}

/// Wires up and runs all components until the shutdown signal arrives.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, config: Config) -> Result<()> {
    // a bad register table is a configuration error, caught before the
    // loop ever touches the bus
    register::validate(register::TABLE)?;

    let channels = Channels::new();
    let slot = Slot::new();

    // claim the command socket before spawning anything; a second
    // instance on the same device must die right here
    let command_socket = CommandSocket::new(config.socket_path(), slot.clone());
    let listener = command_socket.bind().await?;
    let socket_handle = tokio::spawn(async move {
        if let Err(e) = command_socket.serve(listener).await {
            error!("command socket task failed: {}", e);
        }
    });

    let mqtt = Mqtt::new(config.clone(), channels.clone());
    let mqtt_clone = mqtt.clone();
    let mqtt_handle = tokio::spawn(async move {
        if let Err(e) = mqtt_clone.start().await {
            error!("mqtt task failed: {}", e);
        }
    });

    let influx = Influx::new(config.clone(), channels.clone());
    let influx_clone = influx.clone();
    let influx_handle = tokio::spawn(async move {
        if let Err(e) = influx_clone.start().await {
            error!("influx task failed: {}", e);
        }
    });

    let coordinator = Coordinator::new(config.clone(), channels.clone(), slot);
    let coordinator_clone = coordinator.clone();
    let coordinator_handle = tokio::spawn(async move {
        if let Err(e) = coordinator_clone.start().await {
            error!("coordinator task failed: {}", e);
        }
    });

    info!("waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("shutdown signal received, stopping components...");
    coordinator.stop();
    influx.stop();
    let _ = mqtt.stop().await;

    for (name, handle) in [
        ("coordinator", coordinator_handle),
        ("mqtt", mqtt_handle),
        ("influx", influx_handle),
    ] {
        if let Err(e) = handle.await {
            error!("error waiting for {} task: {}", name, e);
        }
    }

    // the accept loop has no shutdown message of its own; drop it and
    // clean up the socket path for the next start
    socket_handle.abort();
    let _ = tokio::fs::remove_file(config.socket_path()).await;

    info!("shutdown complete");

    Ok(())
}
