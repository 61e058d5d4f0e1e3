#![deny(missing_docs)]

//! This crate bridges a serial sensor board to HTTP.
//!
//! The board prints one JSON object per line.
//! A reader task discovers the board (by default, any node matching `/dev/ttyUSB*`,
//! `/dev/ttyACM*` or `/dev/cu.usbserial*`), opens it, and keeps the most recent
//! object in a shared store.
//! If the board goes away the reader marks the store as disconnected and goes back
//! to looking for it.
//!
//! HTTP clients read the store at `/api/sensors`.
//! They always get the best known reading, together with a `connected` flag.

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;

/// Finding the serial device to connect to.
pub mod locator;

/// Serial port driver: opening ports and splitting their output into lines.
pub mod serial;

/// Telemetry snapshots and how they are parsed from lines.
pub mod snapshot;

/// The store shared between the reader and the HTTP handlers.
pub mod store;

/// The reconnecting reader.
///
/// Finds the device, streams lines from it into the store,
/// and starts over whenever something goes wrong.
pub mod reader;

/// Code relating to setting up the HTTP server.
pub mod server;

/// Handlers for the HTTP read endpoint.
pub(crate) mod api;

/// Mocked serial devices, useful to test the reader without actual hardware.
pub mod mock;
