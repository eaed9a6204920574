use crate::prelude::*;

use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// A parsed command-channel request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Maximum charge current, in amps as sent by the producer.
    SetCurrent(f64),
}

/// Parse one ASCII message received on the command socket.
pub fn parse(message: &str) -> Result<Command> {
    let message = message.trim_end_matches(['\r', '\n']);

    if let Some(arg) = message.strip_prefix("current=") {
        let amps: f64 = arg
            .parse()
            .map_err(|_| anyhow!("current: {:?} is not a floating-point literal", arg))?;
        Ok(Command::SetCurrent(amps))
    } else {
        bail!("unknown command: {}", message);
    }
}

/// Accepted setpoint range: off (0) or 6.0 to 16.0 amps. Enforced by the
/// command-line producer and again at admission on the daemon side.
pub fn in_range(amps: f64) -> bool {
    amps == 0.0 || (6.0..=16.0).contains(&amps)
}

/// Convert amps to the device's native unit, tenths of an ampere,
/// truncating. This is the only unit conversion on the write path; the
/// value in the slot goes to the bus as-is.
pub fn to_tenths(amps: f64) -> u16 {
    (amps * 10.0) as u16
}

/// One-shot client mode: hand a charge-current request to the running
/// daemon over its command socket and exit.
pub async fn send(socket_path: &Path, amps: f64) -> Result<()> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|err| anyhow!("unable to connect to a running process: {}", err))?;

    stream
        .write_all(format!("current={:.1}", amps).as_bytes())
        .await?;
    stream.shutdown().await?;

    println!("Current will be set to {:.1} A in next iteration", amps);

    Ok(())
}
