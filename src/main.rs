//! x402 buyer entrypoint.
//!
//! Requests one URL, pays for it if the server answers `402 Payment Required`,
//! and prints the outcome as JSON on stdout.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `EVM_PRIVATE_KEY`, `SOLANA_PRIVATE_KEY` supply signers
//! - `X402_BUYER_CONFIG` points at a JSON configuration file
//! - `RUST_LOG` controls log verbosity (stderr)

use dotenvy::dotenv;
use serde_json::json;
use solana_signer::Signer;
use std::process::ExitCode;
use x402_buyer::config::Config;
use x402_buyer::signal::SigDown;
use x402_buyer::telemetry::Telemetry;
use x402_reqwest::{Negotiator, ReqwestTransport};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let _telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let mut config = Config::load()?;
    if let Some(signer) = &config.evm_signer {
        tracing::info!(address = %signer.address(), "EVM signer configured");
    }
    if let Some(keypair) = &config.solana_keypair {
        tracing::info!(pubkey = %keypair.pubkey(), "Solana signer configured");
    }

    let sig_down = SigDown::try_new()?;
    let negotiator = Negotiator::new(
        ReqwestTransport::new(config.timeout)?,
        config.signing_context(),
    )
    .with_selector(config.preferences)
    .with_cancellation_token(sig_down.cancellation_token());

    let result = negotiator.negotiate(config.request.clone()).await;
    sig_down.shutdown().await;

    match result {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::from(x402_buyer::exit_code(outcome.status)))
        }
        Err(error) => {
            tracing::warn!(code = error.code(), "Negotiation failed: {error}");
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"status": "ERROR", "error": error}))?
            );
            Ok(ExitCode::from(1))
        }
    }
}
