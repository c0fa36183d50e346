//! Environment variable resolution for configuration files.
//!
//! Buyer configuration files hold private keys and RPC endpoints. [`LiteralOrEnv`]
//! lets any of those values be given either literally or as a reference to an
//! environment variable, so secrets can stay out of the file:
//!
//! ```json
//! {
//!   "evmPrivateKey": "$EVM_PRIVATE_KEY",
//!   "rpc": { "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp": "${SOLANA_RPC_URL}" },
//!   "network": "base"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"https://api.mainnet-beta.solana.com"`
/// - Simple env var: `"$SOLANA_RPC_URL"`
/// - Braced env var: `"${SOLANA_RPC_URL}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Error resolving a [`LiteralOrEnv`] value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvResolveError {
    #[error("Environment variable '{var}' not found (referenced as '{reference}')")]
    MissingVar { var: String, reference: String },
    #[error("Failed to parse value: {0}")]
    Parse(String),
}

/// Returns the variable name if `s` is written as `$VAR` or `${VAR}`.
fn env_var_reference(s: &str) -> Option<&str> {
    if let Some(braced) = s.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
        return Some(braced);
    }
    let bare = s.strip_prefix('$')?;
    let is_identifier = !bare.is_empty() && bare.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_identifier.then_some(bare)
}

impl<T> LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    /// Resolves a raw configuration string, reading the environment when it is a reference.
    pub fn resolve(raw: &str) -> Result<Self, EnvResolveError> {
        let value = match env_var_reference(raw) {
            Some(var) => std::env::var(var).map_err(|_| EnvResolveError::MissingVar {
                var: var.to_string(),
                reference: raw.to_string(),
            })?,
            None => raw.to_string(),
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| EnvResolveError::Parse(e.to_string()))
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::resolve(&s).map_err(serde::de::Error::custom)
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
