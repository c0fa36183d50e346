//! Configuration for the `x402-buyer` binary.
//!
//! Values come from three places, later ones winning:
//!
//! 1. an optional JSON file (`--config`), whose string values may reference
//!    environment variables as `$VAR` or `${VAR}`,
//! 2. environment variables (`EVM_PRIVATE_KEY`, `SOLANA_PRIVATE_KEY`), which also
//!    pick up a `.env` file loaded at startup,
//! 3. command-line flags.
//!
//! ```json
//! {
//!   "evmPrivateKey": "$EVM_PRIVATE_KEY",
//!   "solanaPrivateKey": "$SOLANA_PRIVATE_KEY",
//!   "rpc": { "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1": "https://api.devnet.solana.com" },
//!   "network": "base",
//!   "asset": "USDC",
//!   "allowFallback": true
//! }
//! ```

use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Deserialize;
use solana_keypair::Keypair;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use x402_reqwest::{HttpRequest, SigningContext};
use x402_types::chain::ChainId;
use x402_types::config::LiteralOrEnv;
use x402_types::scheme::selector::{PreferredAsset, PreferredNetwork, Preferences};

/// CLI arguments for the x402 buyer.
#[derive(Parser, Debug)]
#[command(name = "x402-buyer")]
#[command(about = "Request a URL, paying for it over x402 if the server asks")]
pub struct CliArgs {
    /// URL of the resource to request
    pub url: Url,
    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,
    /// Request body
    #[arg(long, short = 'd')]
    pub body: Option<String>,
    /// Extra request header as `Name: value`; repeatable
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,
    /// Preferred network: `base` (any EVM chain) or `solana`
    #[arg(long)]
    pub network: Option<PreferredNetwork>,
    /// Preferred asset: `USDC` or `native`
    #[arg(long)]
    pub asset: Option<PreferredAsset>,
    /// Only try payment methods matching the preferences
    #[arg(long)]
    pub no_fallback: bool,
    /// Hex-encoded EVM private key
    #[arg(long, env = "EVM_PRIVATE_KEY", hide_env_values = true)]
    pub evm_private_key: Option<String>,
    /// Base58-encoded 64-byte Solana keypair
    #[arg(long, env = "SOLANA_PRIVATE_KEY", hide_env_values = true)]
    pub solana_private_key: Option<String>,
    /// RPC endpoint override as `<chain-id>=<url>`; repeatable
    #[arg(long = "rpc")]
    pub rpc: Vec<String>,
    /// Per-request timeout in seconds, for HTTP and chain RPC calls
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
    /// Path to a JSON configuration file
    #[arg(long, short, env = "X402_BUYER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub evm_private_key: Option<LiteralOrEnv<PrivateKeySigner>>,
    #[serde(default)]
    pub solana_private_key: Option<LiteralOrEnv<SolanaPrivateKey>>,
    #[serde(default)]
    pub rpc: HashMap<ChainId, LiteralOrEnv<Url>>,
    #[serde(default)]
    pub network: Option<LiteralOrEnv<PreferredNetwork>>,
    #[serde(default)]
    pub asset: Option<LiteralOrEnv<PreferredAsset>>,
    #[serde(default)]
    pub allow_fallback: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &PathBuf) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.clone(), e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A Solana keypair in its standard 64-byte form: secret seed, then public key.
///
/// Parsed from base58, the format of the Solana CLI and wallets.
#[derive(Clone, PartialEq, Eq)]
pub struct SolanaPrivateKey([u8; 64]);

impl SolanaPrivateKey {
    pub fn from_base58(s: &str) -> Result<Self, ConfigError> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| ConfigError::InvalidKey(format!("invalid base58: {e}")))?;
        let bytes: [u8; 64] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ConfigError::InvalidKey(format!(
                "Solana keypair must be 64 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn keypair(&self) -> Result<Keypair, ConfigError> {
        Keypair::try_from(self.0.as_slice()).map_err(|e| ConfigError::InvalidKey(e.to_string()))
    }
}

impl FromStr for SolanaPrivateKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Debug for SolanaPrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SolanaPrivateKey(..)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Fully resolved settings for one run.
pub struct Config {
    pub request: HttpRequest,
    pub preferences: Preferences,
    pub evm_signer: Option<PrivateKeySigner>,
    pub solana_keypair: Option<Keypair>,
    pub rpc_urls: HashMap<ChainId, String>,
    pub timeout: Duration,
}

impl Config {
    /// Parses the command line and merges in the configuration file, if any.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let evm_signer = match args.evm_private_key.as_deref() {
            Some(key) => Some(
                key.trim()
                    .parse::<PrivateKeySigner>()
                    .map_err(|e| ConfigError::InvalidKey(e.to_string()))?,
            ),
            None => file.evm_private_key.map(LiteralOrEnv::into_inner),
        };
        let solana_key = match args.solana_private_key.as_deref() {
            Some(key) => Some(SolanaPrivateKey::from_base58(key)?),
            None => file.solana_private_key.map(LiteralOrEnv::into_inner),
        };
        let solana_keypair = solana_key.as_ref().map(SolanaPrivateKey::keypair).transpose()?;

        let mut rpc_urls: HashMap<ChainId, String> = file
            .rpc
            .into_iter()
            .map(|(chain_id, url)| (chain_id.canonical(), url.into_inner().to_string()))
            .collect();
        for entry in &args.rpc {
            let (chain_id, url) = parse_rpc_override(entry)?;
            rpc_urls.insert(chain_id, url.to_string());
        }

        let mut preferences = Preferences::default()
            .with_fallback(!args.no_fallback && file.allow_fallback.unwrap_or(true));
        if let Some(network) = args.network.or(file.network.map(LiteralOrEnv::into_inner)) {
            preferences = preferences.with_network(network);
        }
        if let Some(asset) = args.asset.or(file.asset.map(LiteralOrEnv::into_inner)) {
            preferences = preferences.with_asset(asset);
        }

        let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| ConfigError::InvalidArgument(format!("method {}: {e}", args.method)))?;
        let mut request = HttpRequest::new(method, args.url);
        request.headers = parse_headers(&args.headers)?;
        if let Some(body) = args.body {
            if !request.headers.contains_key(CONTENT_TYPE) {
                request.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            request = request.with_body(body);
        }

        Ok(Config {
            request,
            preferences,
            evm_signer,
            solana_keypair,
            rpc_urls,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }

    /// Moves the signers and RPC settings into a negotiation context.
    pub fn signing_context(&mut self) -> SigningContext {
        let mut context = SigningContext::new()
            .with_resource_url(self.request.url.to_string())
            .with_rpc_timeout(self.timeout);
        if let Some(signer) = self.evm_signer.take() {
            context = context.with_evm_signer(signer);
        }
        if let Some(keypair) = self.solana_keypair.take() {
            context = context.with_solana_signer(keypair);
        }
        for (chain_id, url) in self.rpc_urls.drain() {
            context = context.with_rpc_url(chain_id, url);
        }
        context
    }
}

fn parse_rpc_override(entry: &str) -> Result<(ChainId, Url), ConfigError> {
    let invalid = || ConfigError::InvalidArgument(format!("--rpc expects <chain-id>=<url>, got {entry}"));
    let (chain_id, url) = entry.split_once('=').ok_or_else(invalid)?;
    let chain_id = chain_id.trim().parse::<ChainId>().map_err(|_| invalid())?.canonical();
    let url = url.trim().parse::<Url>().map_err(|_| invalid())?;
    Ok((chain_id, url))
}

fn parse_headers(headers: &[String]) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for header in headers {
        let invalid = || ConfigError::InvalidArgument(format!("--header expects `Name: value`, got {header}"));
        let (name, value) = header.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
        map.append(name, value);
    }
    Ok(map)
}
