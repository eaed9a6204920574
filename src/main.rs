use wallbox_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    // client mode: hand the request to the running daemon and exit
    if let Some(amps) = options.current {
        let config = Config::new(options.config_file)?;
        if let Err(err) = command::send(&config.socket_path(), amps).await {
            eprintln!("{}", err);
            std::process::exit(1);
        }
        return Ok(());
    }

    wallbox_bridge::run(options.config_file).await
}
