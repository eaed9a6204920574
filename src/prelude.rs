pub use std::io::Write;

pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::command;
pub use crate::config::{self, Config};
pub use crate::coordinator::{self, Coordinator};
pub use crate::device::{self, Device, RegisterIo};
pub use crate::error::{DeviceError, StartupError};
pub use crate::influx::{self, Influx};
pub use crate::mqtt::{self, Mqtt};
pub use crate::options::Options;
pub use crate::register;
pub use crate::setpoint::Slot;
pub use crate::socket::{self, CommandSocket};
