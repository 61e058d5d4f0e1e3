use std::io;

use thiserror::Error;

/// Ways a serial connection can fail.
///
/// Any of these means the connection is over, and the device
/// has to be found and opened again.
#[derive(Debug, Error)]
pub enum SerialPortError {
    /// IO related errors.
    #[error("Underlying IO problem: {0}")]
    IO(#[from] io::Error),

    /// The port could not be opened.
    #[error("Could not open port at {path}, problem: {problem}")]
    Open {
        /// The port we tried to open.
        path: String,

        /// What went wrong.
        problem: String,
    },

    /// Serial port disconnected.
    #[error("Serial port disconnected")]
    Disconnected,
}
