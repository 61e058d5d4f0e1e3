use std::io;

use thiserror::Error;

/// Errors thay may occur outside of the serial core,
/// i.e. when setting up the bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was not usable.
    #[error("Bad configuration: {0}")]
    BadConfig(String),

    /// The configuration file could not be parsed.
    #[error("The configuration could not be deserialized. Problem: {0}")]
    BadRon(#[from] ron::error::SpannedError),

    /// The configuration could not be serialized.
    #[error("The configuration could not be serialized. Problem: {0}")]
    Serialize(#[from] ron::Error),

    /// The HTTP server could not be started, or stopped.
    #[error("Server problem: {0}")]
    Server(String),

    /// IO related errors, e.g. reading a config file.
    #[error("Underlying IO problem: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Get the problem description if this is a [`Error::BadConfig`].
    pub fn try_into_bad_config(self) -> Result<String, Self> {
        if let Self::BadConfig(problem) = self {
            Ok(problem)
        } else {
            Err(self)
        }
    }
}
