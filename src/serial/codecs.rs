/// Splitting a byte stream into lines.
pub mod lines;
