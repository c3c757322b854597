//! Thin binding over the node's JSON-RPC surface
//!
//! Every method issues its requests one after another and surfaces the first
//! failure; nothing here retries.

use std::{fmt, time::Duration};

use alloy::{
    consensus::TxLegacy,
    eips::eip2718::Encodable2718,
    hex,
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash, TxKind, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    transports::http::reqwest::Url,
};
use tracing::{debug, warn};

use crate::{
    error::{FrameworkError, Result},
    identity::Identity,
    receipt::Receipt,
};

/// How [`LedgerClient::wait`] polls for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// A submitted transaction that may be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    tx_hash: TxHash,
}

impl PendingTransaction {
    pub fn new(tx_hash: TxHash) -> Self {
        Self { tx_hash }
    }

    pub fn tx_hash(&self) -> &TxHash {
        &self.tx_hash
    }
}

/// Handle to the ledger node. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct LedgerClient {
    inner: DynProvider,
    wait: WaitConfig,
}

impl fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerClient")
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl LedgerClient {
    /// Connect over HTTP. No request is made until the first operation.
    pub fn http(url: Url, wait: WaitConfig) -> Self {
        let provider = ProviderBuilder::new().connect_http(url);
        Self::from_provider(provider, wait)
    }

    /// Wrap any provider, e.g. one backed by a mocked transport.
    pub fn from_provider<P: Provider + 'static>(provider: P, wait: WaitConfig) -> Self {
        Self {
            inner: provider.erased(),
            wait,
        }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.inner
    }

    /// Read-only execution of `input` against `to` at the latest state.
    pub async fn call(&self, from: Option<Address>, to: Address, input: Bytes) -> Result<Bytes> {
        let mut tx = TransactionRequest::default().with_to(to).with_input(input);
        if let Some(from) = from {
            tx.set_from(from);
        }
        self.inner.call(tx).await.map_err(FrameworkError::RemoteCall)
    }

    pub async fn balance_at(&self, address: Address) -> Result<U256> {
        self.inner
            .get_balance(address)
            .await
            .map_err(FrameworkError::RemoteCall)
    }

    /// Next nonce for `address`, counting transactions still in the pool.
    pub async fn nonce(&self, address: Address) -> Result<u64> {
        self.inner
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(FrameworkError::RemoteCall)
    }

    pub async fn gas_price(&self) -> Result<u128> {
        self.inner
            .get_gas_price()
            .await
            .map_err(FrameworkError::RemoteCall)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.inner
            .get_chain_id()
            .await
            .map_err(FrameworkError::RemoteCall)
    }

    /// Submit an already signed, encoded transaction.
    ///
    /// Node-side rejections are classified by
    /// [`FrameworkError::from_submission`].
    pub async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<PendingTransaction> {
        let tx_hash = self
            .inner
            .raw_request::<_, TxHash>(
                "eth_sendRawTransaction".into(),
                (hex::encode_prefixed(encoded),),
            )
            .await
            .map_err(|err| {
                warn!(%err, "transaction rejected by node");
                FrameworkError::from_submission(err)
            })?;
        debug!(%tx_hash, "transaction submitted");
        Ok(PendingTransaction::new(tx_hash))
    }

    /// Sign and submit a plain legacy transaction from `identity`.
    pub async fn send_legacy(
        &self,
        identity: &Identity,
        to: TxKind,
        value: U256,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<PendingTransaction> {
        let nonce = self.nonce(identity.address()).await?;
        let gas_price = self.gas_price().await?;
        let chain_id = self.chain_id().await?;
        let tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            input,
        };
        let envelope = identity.sign_transaction(tx)?;
        self.send_raw_transaction(&envelope.encoded_2718()).await
    }

    /// Poll until `pending` is mined, dropped, or the wait times out.
    pub async fn wait(&self, pending: PendingTransaction) -> Result<Receipt> {
        let tx_hash = *pending.tx_hash();
        match tokio::time::timeout(self.wait.timeout, self.poll_receipt(tx_hash)).await {
            Ok(result) => result,
            Err(_) => Err(FrameworkError::TransactionTimeout {
                tx_hash,
                after: self.wait.timeout,
            }),
        }
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        loop {
            let receipt = self
                .inner
                .raw_request::<_, Option<Receipt>>("eth_getTransactionReceipt".into(), (tx_hash,))
                .await
                .map_err(FrameworkError::RemoteCall)?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            let known = self
                .inner
                .raw_request::<_, Option<serde_json::Value>>(
                    "eth_getTransactionByHash".into(),
                    (tx_hash,),
                )
                .await
                .map_err(FrameworkError::RemoteCall)?;
            if known.is_none() {
                warn!(%tx_hash, "transaction no longer known to the node");
                return Err(FrameworkError::TransactionDropped { tx_hash });
            }

            debug!(%tx_hash, "waiting for tx to be mined");
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }
}
