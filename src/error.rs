//! Error taxonomy shared by every component of the framework

use std::{path::PathBuf, time::Duration};

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    signers::local::LocalSignerError,
    transports::TransportError,
};

use crate::revert::{self, RevertReason};

pub type Result<T, E = FrameworkError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("invalid private key: {0}")]
    InvalidKey(#[source] LocalSignerError),

    #[error("failed to generate private key: {0}")]
    KeyGeneration(String),

    #[error("artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed artifact {}: {reason}", path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("failed to encode call to `{method}`: {reason}")]
    Encoding { method: String, reason: String },

    #[error("failed to decode output of `{method}`: {reason}")]
    Decoding { method: String, reason: String },

    #[error("remote call failed: {0}")]
    RemoteCall(#[source] TransportError),

    #[error("transaction submission failed: {0}")]
    TransactionSubmission(#[source] TransportError),

    #[error("transaction {tx_hash} not mined after {after:?}")]
    TransactionTimeout { tx_hash: TxHash, after: Duration },

    #[error("transaction {tx_hash} dropped by the node")]
    TransactionDropped { tx_hash: TxHash },

    #[error("peeker {peeker} reverted: {payload}")]
    PeekerRejected { peeker: Address, payload: Bytes },

    #[error("transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: TxHash },

    #[error("deployment failed: {reason}")]
    DeploymentFailed {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("failed to fund {address}: expected balance {expected}, found {actual}")]
    FundingFailed {
        address: Address,
        expected: U256,
        actual: U256,
    },

    #[error("signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),

    #[error("invalid node endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("cannot reach node at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl FrameworkError {
    /// Classify an error returned by `eth_sendRawTransaction`.
    ///
    /// A node rejecting a confidential compute request during off-chain
    /// processing reports a structured revert inside the error message;
    /// anything else is surfaced unchanged.
    pub fn from_submission(err: TransportError) -> Self {
        let reason = match err.as_error_resp() {
            Some(payload) => revert::decode(&payload.message),
            None => revert::decode(&err.to_string()),
        };
        match reason {
            RevertReason::PeekerReverted { peeker, message } => Self::PeekerRejected {
                peeker,
                payload: message,
            },
            RevertReason::Unrecognized => Self::TransactionSubmission(err),
        }
    }

    /// True for failures raised by the application (rejection or revert)
    /// rather than by the transport or local configuration.
    pub fn is_application_failure(&self) -> bool {
        matches!(
            self,
            Self::PeekerRejected { .. } | Self::TransactionReverted { .. }
        )
    }
}
