use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use crate::serial::error::SerialPortError;

/// Lines longer than this are dropped by default.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// This codec splits incoming bytes on a delimiter and yields trimmed lines.
///
/// Bad utf8 is replaced, never an error.
/// Lines that are empty after trimming are skipped.
/// Lines longer than the maximum length are dropped up to and including
/// their delimiter, so a device that never sends one cannot grow the buffer
/// without bound.
#[derive(Debug, Clone)]
pub struct LinesCodec {
    /// How far we have looked for a delimiter into the buffer
    cursor: usize,

    /// How to delimit incoming byte streams.
    /// This delimiter is not included in the yielded frames.
    read_delimiter: u8,

    max_length: usize,

    /// Set while skipping the rest of an over-long line.
    discarding: bool,
}

impl LinesCodec {
    /// Create a new codec.
    pub fn new(read_delimiter: u8, max_length: usize) -> Self {
        Self {
            cursor: 0,
            read_delimiter,
            max_length,
            discarding: false,
        }
    }

    /// Split on newlines, allowing lines up to `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self::new(b'\n', max_length)
    }
}

impl Default for LinesCodec {
    fn default() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for LinesCodec {
    type Item = String;
    type Error = SerialPortError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let read_to = src.len();

            let look_at = &src[self.cursor..read_to];

            let delimiter = self.read_delimiter;
            let Some(position) = look_at.iter().position(|&byte| byte == delimiter) else {
                if self.discarding || read_to > self.max_length {
                    // Nothing in here is worth keeping, it all belongs to a line
                    // which is too long.
                    if !self.discarding {
                        warn!(max_length = self.max_length, "Line too long, discarding");
                    }
                    self.discarding = true;
                    self.cursor = 0;
                    src.clear();
                } else {
                    // Next time, no need to look at what we already looked at.
                    self.cursor = read_to;
                }

                return Ok(None);
            };

            // Since we might "start late" in the buffer (from the cursor),
            // the "global" position within the buffer has to be calculated.
            let actual_position = self.cursor + position;

            // Next time we need to start over.
            self.cursor = 0;

            let line = src.split_to(actual_position);

            // Discard the delimiter.
            src.advance(1);

            if self.discarding {
                self.discarding = false;
                continue;
            }

            if line.len() > self.max_length {
                warn!(
                    length = line.len(),
                    max_length = self.max_length,
                    "Line too long, discarding"
                );
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            return Ok(Some(line.to_owned()));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // Whatever is left never got its delimiter.
        if !src.is_empty() {
            trace!(bytes = src.len(), "Dropping partial line at end of stream");
            src.clear();
        }
        self.cursor = 0;
        self.discarding = false;

        Ok(None)
    }
}
