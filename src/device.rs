use crate::prelude::*;

use async_trait::async_trait;
use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::prelude::*;

use crate::register::ReadFunction;

/// Read-many / write-one access to the wallbox, one transaction at a
/// time. The poll loop owns the only live instance; nothing else talks to
/// the bus.
#[async_trait]
pub trait RegisterIo: Send {
    async fn read_registers(
        &mut self,
        function: ReadFunction,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError>;

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError>;
}

/// Modbus RTU client on the RS-485 serial port.
pub struct Device {
    ctx: Context,
}

impl Device {
    /// Open the serial port and attach the RTU client for the configured
    /// station address.
    pub fn connect(device: &config::Device) -> Result<Self, DeviceError> {
        let parity = match device.parity().to_lowercase().as_str() {
            "none" => tokio_serial::Parity::None,
            "odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::Even,
        };

        let builder = tokio_serial::new(device.port(), device.baudrate())
            .parity(parity)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .timeout(std::time::Duration::from_millis(device.timeout_ms()));

        let serial = tokio_serial::SerialStream::open(&builder)
            .map_err(|err| DeviceError::Connect(err.to_string()))?;

        let ctx = rtu::attach_slave(serial, Slave(device.unit_id()));

        Ok(Self { ctx })
    }
}

#[async_trait]
impl RegisterIo for Device {
    async fn read_registers(
        &mut self,
        function: ReadFunction,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        let response = match function {
            ReadFunction::Holding => self.ctx.read_holding_registers(address, count).await,
            ReadFunction::Input => self.ctx.read_input_registers(address, count).await,
        };

        response
            .map_err(|err| DeviceError::Read(err.to_string()))?
            .map_err(|exc| DeviceError::Read(format!("device exception: {:?}", exc)))
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), DeviceError> {
        self.ctx
            .write_single_register(address, value)
            .await
            .map_err(|err| DeviceError::Write(err.to_string()))?
            .map_err(|exc| DeviceError::Write(format!("device exception: {:?}", exc)))
    }
}
