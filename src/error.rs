use thiserror::Error;

/// A single failed bus transaction. Never retried; the poll loop skips
/// the entry or write step that produced it and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
}

/// Fatal startup conditions. These abort the process before the poll
/// loop ever runs.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A live listener already holds the command socket path. The
    /// existing socket must be left untouched.
    #[error("unable to start - another instance is already listening on {0}")]
    AlreadyRunning(String),
}
