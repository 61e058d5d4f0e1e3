use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serialport::SerialPortInfo;
use tracing::trace;

/// Identifies something we may connect to.
/// Likely "/dev/ttyUSBx" or "COMx".
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DevicePath(String);

impl DevicePath {
    /// Create a device path.
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    /// Borrowed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for DevicePath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&str> for DevicePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl Display for DevicePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Finds the device to connect to.
///
/// Not finding anything is normal, the device might simply not be plugged in.
/// Implementations must be cheap to call repeatedly.
pub trait Locate: Send + Sync {
    /// The device to connect to, if any.
    fn find(&self) -> Option<DevicePath>;

    /// Whether a previously found device is still there.
    ///
    /// Either the path exists on the filesystem, or the operating system
    /// lists a serial port by that name.
    fn is_present(&self, path: &DevicePath) -> bool {
        Path::new(path.as_str()).exists() || is_listed(path, &available_ports())
    }
}

impl<T: Locate + ?Sized> Locate for Box<T> {
    fn find(&self) -> Option<DevicePath> {
        (**self).find()
    }

    fn is_present(&self, path: &DevicePath) -> bool {
        (**self).is_present(path)
    }
}

/// The default patterns scanned for, covering USB-serial and ACM nodes
/// on Linux and USB-serial nodes on macOS.
pub const DEFAULT_PATTERNS: [&str; 3] = ["/dev/ttyUSB*", "/dev/ttyACM*", "/dev/cu.usbserial*"];

/// Scans the filesystem for paths matching a set of glob patterns,
/// e.g. `/dev/ttyUSB*`.
///
/// When several entries match, the lexicographically smallest path is chosen.
#[derive(Debug, Clone)]
pub struct PatternScan {
    patterns: Vec<String>,
}

impl Default for PatternScan {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS)
    }
}

impl PatternScan {
    /// Scan for the given patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|pattern| pattern.as_ref().to_owned())
                .collect(),
        }
    }

    /// All matching paths, sorted and deduplicated.
    pub fn candidates(&self) -> Vec<DevicePath> {
        self.patterns
            .iter()
            .flat_map(|pattern| scan(pattern))
            .filter_map(|path| path.to_str().map(DevicePath::from))
            .sorted()
            .dedup()
            .collect()
    }
}

impl Locate for PatternScan {
    fn find(&self) -> Option<DevicePath> {
        self.candidates().into_iter().next()
    }
}

fn scan(pattern: &str) -> Vec<PathBuf> {
    let paths = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            trace!(%pattern, %e, "Bad pattern, skipping");
            return vec![];
        }
    };

    paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                trace!(%pattern, %e, "Could not read entry");
                None
            }
        })
        .collect()
}

/// Serial ports the operating system knows about.
///
/// Some have no node on the filesystem, e.g. "COMx".
fn available_ports() -> Vec<SerialPortInfo> {
    tokio_serial::available_ports().unwrap_or_else(|e| {
        trace!(%e, "Could not list serial ports");
        vec![]
    })
}

pub(crate) fn is_listed(path: &DevicePath, ports: &[SerialPortInfo]) -> bool {
    ports.iter().any(|port| port.port_name == path.as_str())
}

/// Always the same path, found only when it is present.
#[derive(Debug, Clone)]
pub struct FixedPath {
    path: DevicePath,
}

impl FixedPath {
    /// Use the given path.
    pub fn new(path: impl Into<DevicePath>) -> Self {
        Self { path: path.into() }
    }
}

impl Locate for FixedPath {
    fn find(&self) -> Option<DevicePath> {
        self.is_present(&self.path).then(|| self.path.clone())
    }
}
