//! Serde helpers that read and write `std::time::Duration` as humantime
//! strings (`"30s"`, `"1m 30s"`, `"250ms"`).
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Timeouts {
//!     #[serde(with = "paygate_utils::humantime_serde")]
//!     connect: Duration,
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserializer, Serializer, de};

/// Deserializes a `Duration` from a humantime string.
///
/// # Errors
///
/// Returns a deserialization error when the value is not a string or is
/// not a valid humantime duration.
pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    d.deserialize_str(DurationVisitor)
}

/// Serializes a `Duration` as a humantime string.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&humantime::format_duration(*d).to_string())
}

struct DurationVisitor;

impl de::Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("a duration such as \"30s\" or \"1m 30s\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Duration, E>
    where
        E: de::Error,
    {
        humantime::parse_duration(v).map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}
