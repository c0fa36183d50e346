//! Buyer credentials and per-chain settings, and the scheme registry built from them.

use solana_signer::Signer;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use x402_chain_eip155::{Eip155ExactClient, SignerLike};
use x402_chain_solana::SolanaExactClient;
use x402_chain_solana::chain::default_rpc_url;
use x402_chain_solana::chain::rpc::{DEFAULT_RPC_TIMEOUT, RetryingRpc, rpc_client};
use x402_chain_solana::exact::ComputeBudget;
use x402_types::chain::{ChainFamily, ChainId};
use x402_types::proto::{PaymentKind, PaymentRequired};
use x402_types::scheme::SchemeRegistry;
use x402_types::scheme::client::X402SchemeClient;
use x402_types::util::RetryPolicy;

#[cfg(feature = "telemetry")]
use tracing::{debug, warn};

pub type DynEvmSigner = Arc<dyn SignerLike + Send + Sync>;
pub type DynSolanaSigner = Arc<dyn Signer + Send + Sync>;

/// What the buyer pays with.
///
/// At least one signer must be present for any payment to be attempted.
#[derive(Clone, Default)]
pub struct SigningContext {
    evm_signer: Option<DynEvmSigner>,
    solana_signer: Option<DynSolanaSigner>,
    rpc_urls: HashMap<ChainId, String>,
    resource_url: Option<String>,
    rpc_timeout: Option<Duration>,
    rpc_retry: RetryPolicy,
    compute_budget: ComputeBudget,
}

impl Debug for SigningContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("evm_signer", &self.evm_signer.as_ref().map(|s| s.address()))
            .field(
                "solana_signer",
                &self.solana_signer.as_ref().map(|s| s.pubkey()),
            )
            .field("rpc_urls", &self.rpc_urls)
            .field("resource_url", &self.resource_url)
            .finish()
    }
}

impl SigningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evm_signer<S: SignerLike + Send + Sync + 'static>(mut self, signer: S) -> Self {
        self.evm_signer = Some(Arc::new(signer));
        self
    }

    pub fn with_solana_signer<S: Signer + Send + Sync + 'static>(mut self, signer: S) -> Self {
        self.solana_signer = Some(Arc::new(signer));
        self
    }

    /// Overrides the RPC endpoint for one Solana cluster.
    pub fn with_rpc_url(mut self, chain_id: ChainId, url: impl Into<String>) -> Self {
        self.rpc_urls.insert(chain_id.canonical(), url.into());
        self
    }

    /// Resource reported in v2 payloads when the 402 document names none.
    pub fn with_resource_url(mut self, url: impl Into<String>) -> Self {
        self.resource_url = Some(url.into());
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = Some(timeout);
        self
    }

    pub fn with_rpc_retry(mut self, policy: RetryPolicy) -> Self {
        self.rpc_retry = policy;
        self
    }

    pub fn with_compute_budget(mut self, compute_budget: ComputeBudget) -> Self {
        self.compute_budget = compute_budget;
        self
    }

    pub fn resource_url(&self) -> Option<&str> {
        self.resource_url.as_deref()
    }

    pub fn has_signer(&self) -> bool {
        self.evm_signer.is_some() || self.solana_signer.is_some()
    }

    pub fn has_signer_for(&self, family: ChainFamily) -> bool {
        match family {
            ChainFamily::Eip155 => self.evm_signer.is_some(),
            ChainFamily::Solana => self.solana_signer.is_some(),
        }
    }

    /// RPC endpoint for a Solana cluster: the override if any, else the public default.
    pub fn rpc_url(&self, chain_id: &ChainId) -> Option<&str> {
        self.rpc_urls
            .get(chain_id)
            .map(String::as_str)
            .or_else(|| default_rpc_url(chain_id))
    }

    /// Builders for exactly the chains the server offers and the buyer can pay on.
    ///
    /// Entries on a chain with no signer, or a Solana cluster with no known RPC
    /// endpoint, get no builder; resolving them later yields `UnsupportedNetwork`.
    pub fn registry_for(&self, payment_required: &PaymentRequired) -> SchemeRegistry {
        let mut registry = SchemeRegistry::new();
        let evm_client: Option<Arc<dyn X402SchemeClient>> = self
            .evm_signer
            .clone()
            .map(|signer| Arc::new(Eip155ExactClient::new(signer)) as Arc<dyn X402SchemeClient>);

        for requirements in &payment_required.accepts {
            let Some(chain_id) = &requirements.chain_id else {
                continue;
            };
            if registry.get(chain_id).is_some() {
                continue;
            }
            match &requirements.kind {
                PaymentKind::Eip155Exact { .. } => {
                    if let Some(client) = &evm_client {
                        registry.register(chain_id.clone(), client.clone());
                    }
                }
                PaymentKind::SolanaExact { .. } => {
                    let Some(signer) = &self.solana_signer else {
                        continue;
                    };
                    let Some(url) = self.rpc_url(chain_id) else {
                        #[cfg(feature = "telemetry")]
                        warn!(chain_id = %chain_id, "No RPC endpoint known for Solana cluster");
                        continue;
                    };
                    let timeout = self.rpc_timeout.unwrap_or(DEFAULT_RPC_TIMEOUT);
                    let rpc = RetryingRpc::new(Arc::new(rpc_client(url, timeout)), self.rpc_retry);
                    let client = SolanaExactClient::new(signer.clone(), rpc)
                        .with_compute_budget(self.compute_budget);
                    registry.register(chain_id.clone(), Arc::new(client));
                }
                PaymentKind::Unrecognized => {}
            }
        }

        #[cfg(feature = "telemetry")]
        debug!(chains = ?registry.chain_ids().collect::<Vec<_>>(), "Registered payment builders");
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;
    use serde_json::json;
    use solana_keypair::Keypair;

    const SOLANA_MAINNET: &str = "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

    fn offer() -> PaymentRequired {
        PaymentRequired::from_value(json!({
            "accepts": [
                {
                    "scheme": "exact",
                    "network": SOLANA_MAINNET,
                    "asset": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                    "payTo": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
                    "amount": "10000",
                    "extra": {"feePayer": "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"}
                },
                {
                    "scheme": "exact",
                    "network": "eip155:8453",
                    "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                    "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                    "amount": "10000"
                },
                {
                    "scheme": "exact",
                    "network": "eip155:137",
                    "asset": "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359",
                    "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                    "amount": "10000"
                },
                {
                    "scheme": "upto",
                    "network": "eip155:1",
                    "asset": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                    "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                    "amount": "10000"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_registers_only_offered_chains_with_a_signer() {
        let context = SigningContext::new().with_evm_signer(PrivateKeySigner::random());
        let registry = context.registry_for(&offer());
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&ChainId::new("eip155", "8453")).is_some());
        assert!(registry.get(&ChainId::new("eip155", "137")).is_some());
        assert!(registry.get(&ChainId::new("eip155", "1")).is_none());
        assert!(registry.get(&ChainId::new("eip155", "84532")).is_none());
        assert!(registry.get(&SOLANA_MAINNET.parse::<ChainId>().unwrap()).is_none());
    }

    #[test]
    fn test_solana_builder_needs_solana_signer() {
        let context = SigningContext::new().with_solana_signer(Keypair::new());
        let registry = context.registry_for(&offer());
        let chain_ids: Vec<ChainId> = registry.chain_ids().cloned().collect();
        assert_eq!(chain_ids, vec![SOLANA_MAINNET.parse::<ChainId>().unwrap()]);
    }

    #[test]
    fn test_solana_cluster_names_get_a_builder() {
        let context = SigningContext::new().with_solana_signer(Keypair::new());
        for (network, reference) in [
            ("solana:mainnet", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"),
            ("solana:mainnet-beta", "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"),
            ("solana:devnet", "EtWTRABZaYq6iMfeYKouRu166VU2xqa1"),
        ] {
            let offer = PaymentRequired::from_value(json!({
                "accepts": [{
                    "scheme": "exact",
                    "network": network,
                    "asset": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                    "payTo": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
                    "amount": "10000",
                    "extra": {"feePayer": "2wKupLR9q6wXYppw8Gr2NvWxKBUqm4PPJKkQfoxHDBg4"}
                }]
            }))
            .unwrap();
            let registry = context.registry_for(&offer);
            assert!(registry.resolve(&offer.accepts[0]).is_ok(), "{network}");
            assert!(registry.get(&ChainId::new("solana", reference)).is_some());
        }
    }

    #[test]
    fn test_rpc_url_override_by_cluster_name() {
        let context =
            SigningContext::new().with_rpc_url(ChainId::new("solana", "devnet"), "http://localhost:8899");
        let devnet = ChainId::new("solana", "EtWTRABZaYq6iMfeYKouRu166VU2xqa1");
        assert_eq!(context.rpc_url(&devnet), Some("http://localhost:8899"));
    }

    #[test]
    fn test_rpc_url_override_wins() {
        let chain_id: ChainId = SOLANA_MAINNET.parse().unwrap();
        let context = SigningContext::new();
        assert_eq!(
            context.rpc_url(&chain_id),
            Some("https://api.mainnet-beta.solana.com")
        );
        let context = context.with_rpc_url(chain_id.clone(), "http://localhost:8899");
        assert_eq!(context.rpc_url(&chain_id), Some("http://localhost:8899"));
        assert_eq!(context.rpc_url(&ChainId::new("solana", "unknown")), None);
    }

    #[test]
    fn test_signer_presence() {
        assert!(!SigningContext::new().has_signer());
        let context = SigningContext::new().with_evm_signer(PrivateKeySigner::random());
        assert!(context.has_signer());
        assert!(context.has_signer_for(ChainFamily::Eip155));
        assert!(!context.has_signer_for(ChainFamily::Solana));
    }
}
