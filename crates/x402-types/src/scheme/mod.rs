//! Scheme builders and how the buyer picks between them.
//!
//! A scheme builder ([`client::X402SchemeClient`]) turns one accepts entry into a
//! signed payload for one chain family. The [`SchemeRegistry`] maps CAIP-2 chain IDs
//! to builders; several chains may share one builder instance. The [`selector`]
//! decides the order in which accepts entries are tried.

pub mod client;
pub mod selector;

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::chain::ChainId;
use crate::proto::{PaymentKind, PaymentRequirements};
use crate::scheme::client::{X402Error, X402SchemeClient};

/// Identifies what a scheme builder produces.
pub trait X402SchemeId {
    /// CAIP-2 namespace the builder signs for, e.g. `eip155`.
    fn namespace(&self) -> &str;
    /// Scheme name, e.g. `exact`.
    fn scheme(&self) -> &str;
    fn id(&self) -> String {
        format!("{}:{}", self.namespace(), self.scheme())
    }
}

/// Maps chain IDs to the builder responsible for them.
#[derive(Default, Clone)]
pub struct SchemeRegistry(HashMap<ChainId, Arc<dyn X402SchemeClient>>);

impl Debug for SchemeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self
            .0
            .iter()
            .map(|(chain_id, client)| format!("{chain_id} => {}", client.id()))
            .collect();
        f.debug_tuple("SchemeRegistry").field(&entries).finish()
    }
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client` for `chain_id`, replacing any previous builder for it.
    pub fn register(&mut self, chain_id: ChainId, client: Arc<dyn X402SchemeClient>) {
        self.0.insert(chain_id, client);
    }

    pub fn and_register(mut self, chain_id: ChainId, client: Arc<dyn X402SchemeClient>) -> Self {
        self.register(chain_id, client);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &ChainId> {
        self.0.keys()
    }

    /// The builder for `chain_id`, regardless of scheme.
    pub fn get(&self, chain_id: &ChainId) -> Option<&Arc<dyn X402SchemeClient>> {
        self.0.get(chain_id)
    }

    /// The builder able to pay `requirements`.
    ///
    /// Fails with [`X402Error::UnsupportedNetwork`] when the network is unknown, the
    /// entry is [`PaymentKind::Unrecognized`], nothing is registered for the chain, or
    /// the registered builder speaks another scheme.
    pub fn resolve(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<&Arc<dyn X402SchemeClient>, X402Error> {
        let unsupported = || X402Error::UnsupportedNetwork {
            network: requirements.network.clone(),
            scheme: requirements.scheme.clone(),
        };
        if requirements.kind == PaymentKind::Unrecognized {
            return Err(unsupported());
        }
        let chain_id = requirements.chain_id.as_ref().ok_or_else(unsupported)?;
        let client = self.0.get(chain_id).ok_or_else(unsupported)?;
        if client.namespace() != chain_id.namespace || client.scheme() != requirements.scheme {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                chain_id = %chain_id,
                builder = %client.id(),
                scheme = %requirements.scheme,
                "Registered builder does not speak the requested scheme"
            );
            return Err(unsupported());
        }
        Ok(client)
    }
}
