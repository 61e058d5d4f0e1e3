use tokio::io::AsyncRead;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::{locator::DevicePath, serial::error::SerialPortError};

/// Opens a connection to a device.
///
/// The connection is closed when the returned stream is dropped.
pub trait Connect: Send + Sync {
    /// The stream of bytes coming from the device.
    type Stream: AsyncRead + Unpin + Send + 'static;

    /// Open the device at the given path.
    fn open(&self, path: &DevicePath) -> Result<Self::Stream, SerialPortError>;
}

/// Builder for a [`SerialConnector`].
#[derive(Debug, Default)]
pub struct SerialPortBuilder {
    baud: Option<u32>,
    flow_control: Option<serialport::FlowControl>,
}

impl SerialPortBuilder {
    /// Start a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serial port builder's baud.
    /// Will use 115_200 if not set.
    pub fn set_baud(mut self, baud: u32) -> Self {
        self.baud = Some(baud);
        self
    }

    /// Set the flow control.
    /// Will use none if not set.
    pub fn set_flow_control(mut self, flow_control: serialport::FlowControl) -> Self {
        self.flow_control = Some(flow_control);
        self
    }

    /// Build the connector.
    pub fn build(self) -> SerialConnector {
        SerialConnector {
            baud: self.baud.unwrap_or(115_200),
            flow_control: self.flow_control.unwrap_or(serialport::FlowControl::None),
        }
    }
}

/// Opens real serial ports, 8N1 at a fixed baud rate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    baud: u32,
    flow_control: serialport::FlowControl,
}

impl SerialConnector {
    /// The baud rate ports are opened at.
    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Connect for SerialConnector {
    type Stream = SerialStream;

    fn open(&self, path: &DevicePath) -> Result<SerialStream, SerialPortError> {
        let serial_stream = tokio_serial::new(path.as_str(), self.baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(self.flow_control)
            .open_native_async()
            .map_err(|e| SerialPortError::Open {
                path: path.to_string(),
                problem: e.to_string(),
            })?;

        info!(%path, baud = self.baud, flow_control = ?self.flow_control, "Opened serial port");

        Ok(serial_stream)
    }
}
