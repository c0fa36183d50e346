//! Client-side payment construction for the Solana `exact` scheme.
//!
//! The builder produces a versioned transaction with three instructions:
//!
//! 1. `SetComputeUnitLimit`
//! 2. `SetComputeUnitPrice`
//! 3. `TransferChecked` from the buyer's associated token account to the seller's
//!
//! The seller's `feePayer` (from `extra`) pays for the transaction. Its signature slot
//! is left empty for the seller's relayer to fill in.
//!
//! ```rust
//! use std::sync::Arc;
//! use x402_chain_solana::SolanaExactClient;
//! use x402_chain_solana::chain::rpc::{DEFAULT_RPC_TIMEOUT, rpc_client};
//! use solana_keypair::Keypair;
//!
//! let rpc = rpc_client("https://api.devnet.solana.com", DEFAULT_RPC_TIMEOUT);
//! let client = SolanaExactClient::new(Arc::new(Keypair::new()), Arc::new(rpc));
//! ```

use async_trait::async_trait;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_message::VersionedMessage;
use solana_message::v0::Message as MessageV0;
use solana_pubkey::Pubkey;
use solana_signer::Signer;
use solana_transaction::Instruction;
use spl_token::solana_program::instruction::AccountMeta;
use std::sync::Arc;
use x402_types::proto::{PaymentKind, PaymentRequired, PaymentRequirements};
use x402_types::scheme::X402SchemeId;
use x402_types::scheme::client::{SignedPayload, X402Error, X402SchemeClient};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::chain::parse_pubkey;
use crate::chain::rpc::RpcClientLike;
use crate::exact::{
    ATA_PROGRAM_PUBKEY, ComputeBudget, ExactSolanaPayload, MINT_DECIMALS_OFFSET,
    PartiallySignedTransaction, SolanaExact, TRANSFER_CHECKED_DISCRIMINATOR,
};

/// What the builder needs to know about a token mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mint {
    pub decimals: u8,
    /// SPL Token or Token-2022, whichever owns the mint account.
    pub token_program: Pubkey,
}

impl Mint {
    /// Reads a mint from its raw account.
    pub fn from_account(mint: &Pubkey, owner: &Pubkey, data: &[u8]) -> Result<Self, X402Error> {
        let decimals = *data
            .get(MINT_DECIMALS_OFFSET)
            .ok_or_else(|| X402Error::InvalidMintData {
                mint: mint.to_string(),
                len: data.len(),
            })?;
        let token_program = if *owner == spl_token_2022::id() {
            spl_token_2022::id()
        } else {
            spl_token::id()
        };
        Ok(Self {
            decimals,
            token_program,
        })
    }
}

/// Fetches the mint account and reads its decimals.
pub async fn fetch_mint<R: RpcClientLike>(mint: &Pubkey, rpc_client: &R) -> Result<Mint, X402Error> {
    let account = rpc_client
        .get_mint_account(mint)
        .await
        .map_err(|e| X402Error::ChainQueryFailed(format!("failed to fetch mint {mint}: {e}")))?
        .ok_or_else(|| X402Error::MintNotFound(mint.to_string()))?;
    Mint::from_account(mint, &account.owner, &account.data)
}

/// The associated token account of `owner` for `mint` under `token_program`.
///
/// Pure: the same inputs always derive the same address.
pub fn derive_ata(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Result<Pubkey, X402Error> {
    Pubkey::try_find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    )
    .map(|(address, _bump)| address)
    .ok_or_else(|| {
        X402Error::AddressDerivationFailed(format!("no associated token account for {owner} and mint {mint}"))
    })
}

/// `TransferChecked` data: discriminator, little-endian amount, decimals.
pub fn transfer_checked_data(amount: u64, decimals: u8) -> [u8; 10] {
    let mut data = [0u8; 10];
    data[0] = TRANSFER_CHECKED_DISCRIMINATOR;
    data[1..9].copy_from_slice(&amount.to_le_bytes());
    data[9] = decimals;
    data
}

/// A `TransferChecked` instruction moving `amount` of `mint` from `source` to `destination`.
pub fn transfer_checked_instruction(
    mint: &Pubkey,
    token_program: &Pubkey,
    source: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    Instruction::new_with_bytes(
        *token_program,
        &transfer_checked_data(amount, decimals),
        vec![
            AccountMeta::new(*source, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
    )
}

/// Accounts and amount of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub fee_payer: Pubkey,
    pub pay_to: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// Builds the transfer transaction and signs it as the token owner.
///
/// Either the whole transaction is built and signed, or nothing is returned. The mint
/// is checked before the blockhash is requested, so a bad mint costs one RPC call.
pub async fn build_signed_transfer_transaction<S, R>(
    signer: &S,
    rpc_client: &R,
    params: &TransferParams,
    compute_budget: &ComputeBudget,
) -> Result<PartiallySignedTransaction, X402Error>
where
    S: Signer + ?Sized,
    R: RpcClientLike,
{
    let owner = signer
        .try_pubkey()
        .map_err(|e| X402Error::PaymentConstructionFailed(format!("signer has no public key: {e}")))?;
    let mint = fetch_mint(&params.mint, rpc_client).await?;

    let source_ata = derive_ata(&owner, &params.mint, &mint.token_program)?;
    let destination_ata = derive_ata(&params.pay_to, &params.mint, &mint.token_program)?;

    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(compute_budget.unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(compute_budget.unit_price_micro_lamports),
        transfer_checked_instruction(
            &params.mint,
            &mint.token_program,
            &source_ata,
            &destination_ata,
            &owner,
            params.amount,
            mint.decimals,
        ),
    ];

    let recent_blockhash = rpc_client
        .get_latest_blockhash()
        .await
        .map_err(|e| X402Error::ChainQueryFailed(format!("failed to fetch latest blockhash: {e}")))?;

    let message = MessageV0::try_compile(&params.fee_payer, &instructions, &[], recent_blockhash)
        .map_err(|e| X402Error::PaymentConstructionFailed(format!("failed to compile message: {e}")))?;

    let transaction = PartiallySignedTransaction::new(VersionedMessage::V0(message))
        .sign(signer)
        .map_err(|e| X402Error::PaymentConstructionFailed(e.to_string()))?;

    #[cfg(feature = "telemetry")]
    debug!(
        source_ata = %source_ata,
        destination_ata = %destination_ata,
        missing_signers = transaction.missing_signers().len(),
        "Built Solana transfer transaction"
    );

    Ok(transaction)
}

/// Builds Solana `exact` payloads for one cluster.
///
/// Unlike the EVM builder, each cluster needs its own instance since the RPC
/// client is cluster-specific.
pub struct SolanaExactClient<S: ?Sized, R> {
    signer: Arc<S>,
    rpc_client: R,
    compute_budget: ComputeBudget,
}

impl<S: ?Sized, R> SolanaExactClient<S, R> {
    pub fn new(signer: Arc<S>, rpc_client: R) -> Self {
        Self {
            signer,
            rpc_client,
            compute_budget: ComputeBudget::default(),
        }
    }

    pub fn with_compute_budget(mut self, compute_budget: ComputeBudget) -> Self {
        self.compute_budget = compute_budget;
        self
    }

    pub fn rpc_client(&self) -> &R {
        &self.rpc_client
    }
}

impl<S: ?Sized, R> X402SchemeId for SolanaExactClient<S, R> {
    fn namespace(&self) -> &str {
        SolanaExact.namespace()
    }

    fn scheme(&self) -> &str {
        SolanaExact.scheme()
    }
}

impl TransferParams {
    /// Reads the transfer out of a Solana `exact` requirement.
    pub fn from_requirements(requirements: &PaymentRequirements) -> Result<Self, X402Error> {
        let PaymentKind::SolanaExact { fee_payer } = &requirements.kind else {
            return Err(X402Error::UnsupportedNetwork {
                network: requirements.network.clone(),
                scheme: requirements.scheme.clone(),
            });
        };
        let fee_payer = fee_payer.as_deref().ok_or(X402Error::MissingFeePayer)?;
        let amount = u64::try_from(requirements.amount.inner()).map_err(|_| {
            X402Error::PaymentConstructionFailed(format!(
                "amount {} does not fit in u64",
                requirements.amount
            ))
        })?;
        Ok(Self {
            fee_payer: parse_pubkey("feePayer", fee_payer)?,
            pay_to: parse_pubkey("payTo", &requirements.pay_to)?,
            mint: parse_pubkey("asset", &requirements.asset)?,
            amount,
        })
    }
}

#[async_trait]
impl<S, R> X402SchemeClient for SolanaExactClient<S, R>
where
    S: Signer + Send + Sync + ?Sized,
    R: RpcClientLike + Send + Sync,
{
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "x402.solana.build_payload",
            skip_all,
            fields(network = %requirements.network, asset = %requirements.asset),
            err
        )
    )]
    async fn build_payload(
        &self,
        payment_required: &PaymentRequired,
        requirements: &PaymentRequirements,
    ) -> Result<SignedPayload, X402Error> {
        let params = TransferParams::from_requirements(requirements)?;
        let transaction = build_signed_transfer_transaction(
            self.signer.as_ref(),
            &self.rpc_client,
            &params,
            &self.compute_budget,
        )
        .await?;
        let payer = self
            .signer
            .try_pubkey()
            .map_err(|e| X402Error::PaymentConstructionFailed(e.to_string()))?;
        let payload = ExactSolanaPayload {
            transaction: transaction
                .to_base64()
                .map_err(|e| X402Error::PaymentConstructionFailed(format!("failed to serialize transaction: {e}")))?,
        };
        SignedPayload::new(payment_required, requirements, payer.to_string(), payload)
    }
}
