//! Unix timestamp utilities for payment authorization windows.
//!
//! EIP-3009 authorizations carry a `validAfter` / `validBefore` window. The buyer
//! backdates `validAfter` so the authorization is immediately usable despite clock
//! skew, and bounds `validBefore` by the server's `maxTimeoutSeconds`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// Seconds since the Unix epoch.
///
/// Serialized as a stringified integer, `"1699999999"`, since JavaScript
/// numbers cannot represent every 64-bit integer.
///
/// ```
/// use x402_types::timestamp::UnixTimestamp;
///
/// let ts = UnixTimestamp::from_secs(1_000);
/// assert_eq!((ts + 60).as_secs(), 1_060);
/// assert_eq!(ts.saturating_sub(5_000).as_secs(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>()
            .map(UnixTimestamp)
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0.saturating_add(rhs))
    }
}

impl UnixTimestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self(secs)
    }

    pub fn saturating_sub(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}
