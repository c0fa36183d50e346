//! Wire types and transaction layout of the Solana `exact` payload.

use serde::{Deserialize, Serialize};
use solana_pubkey::{Pubkey, pubkey};

#[cfg(feature = "client")]
use solana_message::VersionedMessage;
#[cfg(feature = "client")]
use solana_signature::Signature;
#[cfg(feature = "client")]
use solana_signer::Signer;
#[cfg(feature = "client")]
use solana_transaction::versioned::VersionedTransaction;
#[cfg(feature = "client")]
use x402_types::util::Base64Bytes;

/// Associated Token Account program.
pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// `TransferChecked` instruction discriminator, shared by SPL Token and Token-2022.
pub const TRANSFER_CHECKED_DISCRIMINATOR: u8 = 12;

/// Offset of the `decimals` byte in the SPL mint account layout.
pub const MINT_DECIMALS_OFFSET: usize = 44;

/// Default compute-unit limit of a payment transaction.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 8_000;
/// Default compute-unit price, in micro-lamports.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 1;

/// Scheme payload: the partially signed transaction, bincode-serialized and base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSolanaPayload {
    pub transaction: String,
}

/// Compute budget instructions prepended to every payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub unit_price_micro_lamports: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            unit_price_micro_lamports: DEFAULT_COMPUTE_UNIT_PRICE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransactionSignError {
    #[error("{0} is not a required signer of this transaction")]
    NotARequiredSigner(Pubkey),
    #[error("Signer failed: {0}")]
    Signer(String),
}

/// A versioned transaction that knows which of its required signatures are present.
///
/// The buyer signs as token owner; the fee payer's slot stays empty until the
/// seller's relayer co-signs. Empty slots hold the all-zero signature on the wire.
#[cfg(feature = "client")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartiallySignedTransaction {
    inner: VersionedTransaction,
}

#[cfg(feature = "client")]
impl PartiallySignedTransaction {
    /// An unsigned transaction with one empty slot per required signer.
    pub fn new(message: VersionedMessage) -> Self {
        let num_required = message.header().num_required_signatures as usize;
        Self {
            inner: VersionedTransaction {
                signatures: vec![Signature::default(); num_required],
                message,
            },
        }
    }

    pub fn inner(&self) -> &VersionedTransaction {
        &self.inner
    }

    /// Signers the message declares, fee payer first.
    pub fn required_signers(&self) -> &[Pubkey] {
        let num_required = self.inner.message.header().num_required_signatures as usize;
        let keys = self.inner.message.static_account_keys();
        &keys[..num_required.min(keys.len())]
    }

    fn slots(&self) -> impl Iterator<Item = (&Pubkey, bool)> {
        let empty = Signature::default();
        self.required_signers()
            .iter()
            .zip(self.inner.signatures.iter())
            .map(move |(key, signature)| (key, *signature != empty))
    }

    pub fn present_signers(&self) -> Vec<Pubkey> {
        self.slots()
            .filter_map(|(key, present)| present.then_some(*key))
            .collect()
    }

    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.slots()
            .filter_map(|(key, present)| (!present).then_some(*key))
            .collect()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Adds `signer`'s signature over the message in its slot.
    pub fn sign<S: Signer + ?Sized>(mut self, signer: &S) -> Result<Self, TransactionSignError> {
        let pubkey = signer
            .try_pubkey()
            .map_err(|e| TransactionSignError::Signer(e.to_string()))?;
        let position = self
            .required_signers()
            .iter()
            .position(|key| *key == pubkey)
            .ok_or(TransactionSignError::NotARequiredSigner(pubkey))?;
        let signature = signer
            .try_sign_message(&self.inner.message.serialize())
            .map_err(|e| TransactionSignError::Signer(e.to_string()))?;
        self.inner.signatures[position] = signature;
        Ok(self)
    }

    /// Wire encoding: bincode, then base64.
    pub fn to_base64(&self) -> Result<String, bincode::Error> {
        let bytes = bincode::serialize(&self.inner)?;
        Ok(Base64Bytes::encode(bytes).to_string())
    }
}
