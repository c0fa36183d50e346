//! The two chain reads the `exact` builder needs, and a retrying wrapper around them.

use solana_account::Account;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use std::time::Duration;
use x402_types::util::RetryPolicy;

/// Per-call timeout of chain RPC requests.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

pub trait RpcClientLike {
    /// The account at `pubkey`, or `None` when it does not exist.
    fn get_mint_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send;
    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send;
}

impl<Container: AsRef<RpcClient>> RpcClientLike for Container {
    fn get_mint_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send {
        let rpc_client = self.as_ref();
        async move {
            rpc_client
                .get_account_with_commitment(pubkey, rpc_client.commitment())
                .await
                .map(|response| response.value)
        }
    }
    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        RpcClient::get_latest_blockhash(self.as_ref())
    }
}

/// Creates a nonblocking RPC client with a per-call timeout and `confirmed` commitment.
pub fn rpc_client(url: impl Into<String>, timeout: Duration) -> RpcClient {
    RpcClient::new_with_timeout_and_commitment(url.into(), timeout, CommitmentConfig::confirmed())
}

/// Whether a failed RPC call may succeed when repeated: I/O errors and HTTP-level
/// failures (timeouts, 429s) are, RPC-level errors are not.
pub fn is_transient(error: &ClientError) -> bool {
    matches!(
        error.kind(),
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_)
    )
}

/// Retries transient failures of the wrapped client under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingRpc<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R> RetryingRpc<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: RpcClientLike + Sync> RpcClientLike for RetryingRpc<R> {
    fn get_mint_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, ClientError>> + Send {
        self.policy.retry(
            || self.inner.get_mint_account(pubkey),
            |outcome| outcome.as_ref().is_err_and(is_transient),
        )
    }
    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, ClientError>> + Send {
        self.policy.retry(
            || self.inner.get_latest_blockhash(),
            |outcome| outcome.as_ref().is_err_and(is_transient),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyRpc {
        failures: usize,
        kind: fn() -> ClientErrorKind,
        calls: AtomicUsize,
    }

    impl RpcClientLike for FlakyRpc {
        async fn get_mint_account(&self, _pubkey: &Pubkey) -> Result<Option<Account>, ClientError> {
            unimplemented!()
        }
        async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ClientError::from((self.kind)()))
            } else {
                Ok(Hash::new_from_array([7; 32]))
            }
        }
    }

    fn io_error() -> ClientErrorKind {
        ClientErrorKind::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"))
    }

    fn custom_error() -> ClientErrorKind {
        ClientErrorKind::Custom("invalid params".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_io_errors() {
        let rpc = RetryingRpc::new(
            FlakyRpc {
                failures: 2,
                kind: io_error,
                calls: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
        );
        assert!(rpc.get_latest_blockhash().await.is_ok());
        assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_rpc_errors() {
        let rpc = RetryingRpc::new(
            FlakyRpc {
                failures: 1,
                kind: custom_error,
                calls: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
        );
        assert!(rpc.get_latest_blockhash().await.is_err());
        assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 1);
    }
}
