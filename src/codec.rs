//! JSON encode/decode policy.
//!
//! [`JsonCodec`] owns everything about how payloads cross the wire: strict
//! serde encoding/decoding, the lenient fallback for primitive and empty
//! response bodies, and the configured [`DateFormat`] applied to
//! [`Timestamp`] fields.
//!
//! The lenient fallback exists because many APIs answer a structured request
//! with a bare scalar (`42`, `"ok"`) or a literal `null`. A strict decode of
//! those against a typed target fails with a data-shaped error; the codec
//! then re-reads the body as a generic JSON value and narrows it:
//!
//! - `null` becomes "no value" rather than an error
//! - a string or boolean fragment is accepted when the target type matches
//! - a numeric fragment is accepted for any numeric target, truncating
//!   toward zero when a fractional value meets an integer target
//!
//! Any other shape re-raises the original decode error. Malformed JSON is
//! never downgraded.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{Error, Result};

/// How [`Timestamp`] values are written to and read from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Integer seconds since the Unix epoch.
    #[default]
    UnixSeconds,
    /// Integer milliseconds since the Unix epoch.
    UnixMillis,
    /// RFC 7231 HTTP-date strings, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    HttpDate,
}

thread_local! {
    static ACTIVE_DATE_FORMAT: Cell<DateFormat> = Cell::new(DateFormat::UnixSeconds);
}

fn active_date_format() -> DateFormat {
    ACTIVE_DATE_FORMAT.with(Cell::get)
}

/// The encode/decode policy shared by a client and its in-flight requests.
///
/// The codec, not the whole client, is what outstanding requests hold on to,
/// so a client can be dropped while requests it dispatched are still
/// completing.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    date_format: DateFormat,
}

impl JsonCodec {
    /// Creates a codec with the given date strategy.
    pub fn new(date_format: DateFormat) -> Self {
        Self { date_format }
    }

    /// The configured date strategy.
    pub fn date_format(&self) -> DateFormat {
        self.date_format
    }

    /// Serializes `value` to JSON bytes.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        self.scoped(|| serde_json::to_vec(value)).map_err(Error::from)
    }

    /// Deserializes JSON bytes into `T`, applying the lenient fragment
    /// fallback when a strict decode fails on a data-shaped error.
    ///
    /// Returns `Ok(None)` when the body is the JSON literal `null`.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<Option<T>> {
        match self.scoped(|| serde_json::from_slice::<T>(bytes)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_data() => self.decode_fragment(bytes, e),
            Err(e) => Err(e.into()),
        }
    }

    /// The lenient path: narrow a generic JSON value to `T`, or re-raise the
    /// original strict-decode error.
    fn decode_fragment<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        original: serde_json::Error,
    ) -> Result<Option<T>> {
        let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
            return Err(original.into());
        };
        match value {
            Value::Null => Ok(None),
            Value::Number(ref number) => {
                if let Ok(v) = self.scoped(|| serde_json::from_value::<T>(value.clone())) {
                    return Ok(Some(v));
                }
                // Fractional payload against an integer target truncates
                // toward zero.
                if let Some(f) = number.as_f64() {
                    let truncated = if f >= 0.0 {
                        Value::from(f.trunc() as u64)
                    } else {
                        Value::from(f.trunc() as i64)
                    };
                    if let Ok(v) = self.scoped(|| serde_json::from_value::<T>(truncated)) {
                        return Ok(Some(v));
                    }
                }
                Err(original.into())
            }
            Value::String(_) | Value::Bool(_) => self
                .scoped(|| serde_json::from_value::<T>(value))
                .map(Some)
                .map_err(|_| original.into()),
            _ => Err(original.into()),
        }
    }

    /// Runs `f` with this codec's date format active for [`Timestamp`]
    /// serialization. The previous format is restored afterwards, so nested
    /// codecs with different strategies do not interfere.
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        ACTIVE_DATE_FORMAT.with(|cell| {
            let previous = cell.replace(self.date_format);
            let out = f();
            cell.set(previous);
            out
        })
    }
}

/// A point in time serialized per the owning codec's [`DateFormat`].
///
/// Outside a codec call the default format (Unix seconds) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub SystemTime);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(SystemTime::now())
    }

    fn since_epoch(&self) -> std::result::Result<Duration, String> {
        self.0
            .duration_since(UNIX_EPOCH)
            .map_err(|_| "timestamp predates the Unix epoch".to_string())
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self(time)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        match active_date_format() {
            DateFormat::UnixSeconds => {
                let secs = self.since_epoch().map_err(S::Error::custom)?.as_secs();
                serializer.serialize_u64(secs)
            }
            DateFormat::UnixMillis => {
                let millis = self.since_epoch().map_err(S::Error::custom)?.as_millis();
                serializer.serialize_u64(millis as u64)
            }
            DateFormat::HttpDate => serializer.serialize_str(&httpdate::fmt_http_date(self.0)),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error as _;
        match active_date_format() {
            DateFormat::UnixSeconds => {
                let secs = u64::deserialize(deserializer)?;
                Ok(Self(UNIX_EPOCH + Duration::from_secs(secs)))
            }
            DateFormat::UnixMillis => {
                let millis = u64::deserialize(deserializer)?;
                Ok(Self(UNIX_EPOCH + Duration::from_millis(millis)))
            }
            DateFormat::HttpDate => {
                let text = String::deserialize(deserializer)?;
                httpdate::parse_http_date(&text)
                    .map(Self)
                    .map_err(D::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn test_round_trip_struct() {
        let codec = JsonCodec::default();
        let payload = Payload {
            name: "widget".to_string(),
            count: 7,
        };
        let bytes = codec.encode(&payload).unwrap();
        let back: Option<Payload> = codec.decode(&bytes).unwrap();
        assert_eq!(back, Some(payload));
    }

    #[test]
    fn test_null_body_decodes_to_none() {
        let codec = JsonCodec::default();
        let result: Option<Payload> = codec.decode(b"null").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_bare_integer_fragment() {
        let codec = JsonCodec::default();
        let result: Option<i64> = codec.decode(b"42").unwrap();
        assert_eq!(result, Some(42));
    }

    #[test]
    fn test_fractional_fragment_truncates_toward_zero() {
        let codec = JsonCodec::default();
        let result: Option<i64> = codec.decode(b"42.9").unwrap();
        assert_eq!(result, Some(42));
        let result: Option<i64> = codec.decode(b"-3.7").unwrap();
        assert_eq!(result, Some(-3));
    }

    #[test]
    fn test_string_fragment_rejected_for_numeric_target() {
        let codec = JsonCodec::default();
        let result: Result<Option<i64>> = codec.decode(b"\"42\"");
        assert!(matches!(result, Err(Error::Coding(_))));
    }

    #[test]
    fn test_object_mismatch_propagates_original_error() {
        let codec = JsonCodec::default();
        let result: Result<Option<Payload>> = codec.decode(b"{\"wrong\":true}");
        assert!(matches!(result, Err(Error::Coding(_))));
    }

    #[test]
    fn test_malformed_json_is_not_downgraded() {
        let codec = JsonCodec::default();
        let result: Result<Option<i64>> = codec.decode(b"not json");
        assert!(matches!(result, Err(Error::Coding(_))));
    }

    #[test]
    fn test_timestamp_unix_seconds() {
        let codec = JsonCodec::new(DateFormat::UnixSeconds);
        let ts = Timestamp(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        let bytes = codec.encode(&ts).unwrap();
        assert_eq!(bytes, b"1700000000");
        let back: Option<Timestamp> = codec.decode(&bytes).unwrap();
        assert_eq!(back, Some(ts));
    }

    #[test]
    fn test_timestamp_http_date() {
        let codec = JsonCodec::new(DateFormat::HttpDate);
        let ts = Timestamp(UNIX_EPOCH + Duration::from_secs(784_111_777));
        let bytes = codec.encode(&ts).unwrap();
        assert_eq!(bytes, b"\"Sun, 06 Nov 1994 08:49:37 GMT\"");
        let back: Option<Timestamp> = codec.decode(&bytes).unwrap();
        assert_eq!(back, Some(ts));
    }

    #[test]
    fn test_timestamp_unix_millis() {
        let codec = JsonCodec::new(DateFormat::UnixMillis);
        let ts = Timestamp(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
        let bytes = codec.encode(&ts).unwrap();
        assert_eq!(bytes, b"1700000000123");
        let back: Option<Timestamp> = codec.decode(&bytes).unwrap();
        assert_eq!(back, Some(ts));
    }
}
