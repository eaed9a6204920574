use clap::Parser;

/// Wallbox Bridge - polls a wallbox charging controller over Modbus RTU
/// into MQTT and InfluxDB
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Set maximum charge current on the running daemon and exit
    #[clap(short = 'c', long = "current", value_parser = charge_current)]
    pub current: Option<f64>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

fn charge_current(arg: &str) -> Result<f64, String> {
    let amps: f64 = arg
        .parse()
        .map_err(|_| format!("{} not a floating-point literal", arg))?;

    if !crate::command::in_range(amps) {
        return Err(format!("{} can only be 0 or 6-16", arg));
    }

    Ok(amps)
}
