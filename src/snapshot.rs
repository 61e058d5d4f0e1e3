use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// A single telemetry reading, as sent by the device.
///
/// Any JSON object is accepted; there is no fixed schema.
/// A snapshot is never modified after it is parsed, it is only ever replaced
/// by a newer one. Cloning is cheap since the fields are shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Arc<Map<String, Value>>);

impl Snapshot {
    /// The fields of this reading.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a single field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// How many fields there are.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the initial snapshot, before anything was received.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(fields: Map<String, Value>) -> Self {
        Self(Arc::new(fields))
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} field(s)", self.len())
    }
}

/// Try to turn a line from the device into a [`Snapshot`].
///
/// Lines which are not shaped like an object (after trimming) are skipped
/// without attempting to decode them, e.g. boot banners.
/// Lines which are shaped like one but still are not valid JSON
/// (e.g. cut in half by a reconnect) are also skipped.
pub fn parse(line: &str) -> Option<Snapshot> {
    let line = line.trim();

    if !(line.starts_with('{') && line.ends_with('}')) {
        trace!(%line, "Not an object, ignoring");
        return None;
    }

    match serde_json::from_str::<Map<String, Value>>(line) {
        Ok(fields) => Some(fields.into()),
        Err(e) => {
            trace!(%line, %e, "Could not decode, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_object() {
        let snapshot = parse(r#"{"temp":21.5}"#).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("temp"), Some(&json!(21.5)));
    }

    #[test]
    fn trims_before_checking_shape() {
        let snapshot = parse("  \t{\"temp\":21.5}\r\n").unwrap();

        assert_eq!(snapshot.get("temp"), Some(&json!(21.5)));
    }

    #[test]
    fn nested_values_are_kept() {
        let snapshot =
            parse(r#"{"pm":{"1_0":3,"2_5":7},"levels":[1,2,3],"aqi_level":"Good","ok":true}"#)
                .unwrap();

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get("pm"), Some(&json!({"1_0": 3, "2_5": 7})));
        assert_eq!(snapshot.get("levels"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn empty_object_is_a_snapshot() {
        let snapshot = parse("{}").unwrap();

        assert!(snapshot.is_empty());
    }

    #[test]
    fn not_object_shaped_is_ignored() {
        for line in [
            "",
            "   ",
            "BOOT OK",
            "[1, 2, 3]",
            "42",
            r#""temp""#,
            r#"{"temp":21.5"#,
            r#""temp":21.5}"#,
            r#"x{"temp":21.5}"#,
            r#"{"temp":21.5}x"#,
            "null",
        ] {
            assert_eq!(parse(line), None, "line: `{line}`");
        }
    }

    #[test]
    fn object_shaped_but_invalid_is_ignored() {
        for line in [
            "{",
            "}",
            "{oops}",
            r#"{"temp":}"#,
            r#"{"temp":21.5,}"#,
            r#"{"temp":21.5}{"temp":22.0}"#,
            r#"{"a":1} garbage {"b":2}"#,
            "{\"temp\":\u{FFFD}}",
        ] {
            assert_eq!(parse(line), None, "line: `{line}`");
        }
    }

    #[test]
    fn serializes_as_plain_object() {
        let snapshot = parse(r#"{"temp":21.5}"#).unwrap();

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"temp": 21.5})
        );
    }
}
