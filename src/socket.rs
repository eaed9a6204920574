use crate::prelude::*;

use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};

use crate::command::Command;

/// Command channel server: a Unix socket other processes on this host use
/// to schedule a charge-current write without opening a second bus
/// connection. One connection at a time, one message per connection.
pub struct CommandSocket {
    path: PathBuf,
    slot: Slot,
}

impl CommandSocket {
    pub fn new(path: PathBuf, slot: Slot) -> Self {
        Self { path, slot }
    }

    /// Claim the socket path.
    ///
    /// An existing path that accepts a connection means another instance
    /// owns the bus; refuse to start and leave its socket alone. An
    /// existing path nobody answers on is a leftover from an unclean exit
    /// and is removed before binding.
    pub async fn bind(&self) -> Result<UnixListener> {
        if self.path.exists() {
            match UnixStream::connect(&self.path).await {
                Ok(_) => {
                    return Err(
                        StartupError::AlreadyRunning(self.path.display().to_string()).into()
                    );
                }
                Err(_) => {
                    warn!("removing stale socket {}", self.path.display());
                    tokio::fs::remove_file(&self.path).await?;
                }
            }
        }

        let listener = UnixListener::bind(&self.path)?;
        info!("listening socket created at {}", self.path.display());

        Ok(listener)
    }

    /// Accept loop. Runs for the life of the process; a bad message only
    /// costs its own connection.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        loop {
            let (mut stream, _) = listener.accept().await?;
            if let Err(err) = self.handle(&mut stream).await {
                warn!("{}", err);
            }
        }
    }

    async fn handle(&self, stream: &mut UnixStream) -> Result<()> {
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let message = String::from_utf8_lossy(&buf[..n]).into_owned();
        debug!("received: {:?}", message);

        self.apply(&message)
    }

    /// Parse one message and admit it into the pending-setpoint slot.
    /// Anything malformed or out of range is dropped without touching an
    /// already pending value.
    pub fn apply(&self, message: &str) -> Result<()> {
        let Command::SetCurrent(amps) = command::parse(message)?;

        if !command::in_range(amps) {
            bail!("rejecting out-of-range charge current: {}", amps);
        }

        self.slot.set(command::to_tenths(amps));
        Ok(())
    }
}
