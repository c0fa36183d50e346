//! Log output for the `x402-buyer` binary.
//!
//! Logs go to stderr so stdout carries nothing but the JSON outcome. The level
//! defaults to `info` and follows `RUST_LOG` when set, e.g.
//! `RUST_LOG=x402_reqwest=debug,x402_chain_solana=trace`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct Telemetry {
    name: &'static str,
    version: &'static str,
    ansi: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            ansi: true,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Disables terminal colors, for output captured to files.
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Filter from `RUST_LOG`, or [`DEFAULT_FILTER`] when unset or unparsable.
    pub fn env_filter() -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Installs the subscriber. Does nothing if one is already installed.
    pub fn register(self) -> Self {
        let installed = tracing_subscriber::registry()
            .with(Self::env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(self.ansi),
            )
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(name = self.name, version = self.version, "Logging initialized");
        }
        self
    }
}
