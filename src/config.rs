use std::{net::SocketAddr, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    locator::{DevicePath, FixedPath, Locate, PatternScan, DEFAULT_PATTERNS},
    reader::ReaderSettings,
    serial::{
        codecs::lines::DEFAULT_MAX_LINE_LENGTH,
        serial_port::{SerialConnector, SerialPortBuilder},
    },
};

/// The default port the HTTP server listens on.
pub const DEFAULT_PORT: u16 = 8888;

/// How to find the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceConfig {
    /// Use the smallest path matching any of these patterns,
    /// e.g. `/dev/ttyUSB*`.
    Scan(Vec<String>),

    /// Always use this path.
    Fixed(DevicePath),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::Scan(DEFAULT_PATTERNS.iter().map(|&p| p.to_owned()).collect())
    }
}

impl DeviceConfig {
    /// The locator described by this configuration.
    pub fn locator(&self) -> Box<dyn Locate> {
        match self {
            DeviceConfig::Scan(patterns) => Box::new(PatternScan::new(patterns)),
            DeviceConfig::Fixed(path) => Box::new(FixedPath::new(path.clone())),
        }
    }
}

/// The configuration used for running the bridge.
///
/// Missing fields take their default values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the HTTP server listens.
    pub listen: SocketAddr,

    /// How to find the serial device.
    pub device: DeviceConfig,

    /// The baud rate the device is opened at.
    pub baud: u32,

    /// Serial flow control.
    pub flow_control: serialport::FlowControl,

    /// How long to wait for a line, in milliseconds, before checking that
    /// the device is still there.
    pub read_timeout_ms: u64,

    /// How long to wait between attempts to find or open the device,
    /// in milliseconds.
    pub retry_backoff_ms: u64,

    /// Lines longer than this (in bytes) are discarded.
    pub max_line_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            device: DeviceConfig::default(),
            baud: 115_200,
            flow_control: serialport::FlowControl::None,
            read_timeout_ms: 2_000,
            retry_backoff_ms: 1_000,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, Error> {
        Ok(Self::ron().from_str::<Config>(input)?)
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            device: DeviceConfig::Scan(vec!["/dev/ttyUSB*".into(), "/dev/ttyACM*".into()]),
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ..Default::default()
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> Result<String, Error> {
        Ok(Self::ron().to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let s = std::fs::read_to_string(p)?;

        Self::deserialize(&s)
    }

    /// The reader settings described by this configuration.
    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_line_length: self.max_line_length,
        }
    }

    /// A connector opening real serial ports with these settings.
    pub fn connector(&self) -> SerialConnector {
        SerialPortBuilder::new()
            .set_baud(self.baud)
            .set_flow_control(self.flow_control)
            .build()
    }

    fn check_serial(&self) -> Result<(), Error> {
        if self.baud == 0 {
            return Err(Error::BadConfig("The baud rate must be non-zero".into()));
        }

        if self.max_line_length == 0 {
            return Err(Error::BadConfig(
                "The maximum line length must be non-zero".into(),
            ));
        }

        Ok(())
    }

    fn check_timing(&self) -> Result<(), Error> {
        // A zero read timeout would never let a line through.
        if self.read_timeout_ms == 0 {
            return Err(Error::BadConfig("The read timeout must be non-zero".into()));
        }

        Ok(())
    }

    fn check_device(&self) -> Result<(), Error> {
        match &self.device {
            DeviceConfig::Scan(patterns) if patterns.is_empty() => Err(Error::BadConfig(
                "At least one device pattern is needed to scan for".into(),
            )),
            DeviceConfig::Scan(patterns) => {
                for (index, pattern) in patterns.iter().enumerate() {
                    if let Err(e) = glob::Pattern::new(pattern) {
                        return Err(Error::BadConfig(format!(
                            "The pattern with index {index} (zero indexed) is not a valid glob: `{pattern}`: {e}"
                        )));
                    }

                    if Path::new(pattern).file_name().is_none() {
                        return Err(Error::BadConfig(format!(
                            "The pattern with index {index} (zero indexed) has no file name part: `{pattern}`"
                        )));
                    }
                }

                Ok(())
            }
            DeviceConfig::Fixed(path) if path.as_str().is_empty() => {
                Err(Error::BadConfig("The fixed device path is empty".into()))
            }
            DeviceConfig::Fixed(_) => Ok(()),
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), Error> {
        self.check_serial()?;
        self.check_timing()?;
        self.check_device()?;

        Ok(())
    }
}
