//! Inclusion receipts as reported by the node

use alloy::{
    primitives::{Address, TxHash, U64},
    rpc::types::Log,
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The node's record of a mined transaction.
///
/// Deserialized field by field rather than through a typed receipt envelope,
/// so receipts of confidential compute transactions decode as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U64>,
}

impl Receipt {
    /// True only when the node reports status `1`.
    pub fn succeeded(&self) -> bool {
        self.status == Some(U64::from(1))
    }

    /// Decode every log emitted as event `E`.
    ///
    /// Logs that do not decode as `E` are skipped. Anonymous events carry no
    /// signature topic, so for them every log whose shape fits is returned.
    pub fn decode_logs<E: SolEvent>(&self) -> Vec<E> {
        self.logs
            .iter()
            .filter(|log| E::ANONYMOUS || log.topics().first() == Some(&E::SIGNATURE_HASH))
            .filter_map(|log| match log.log_decode_validate::<E>() {
                Ok(decoded) => Some(decoded.inner.data),
                Err(err) => {
                    debug!(%err, "skipping undecodable log");
                    None
                }
            })
            .collect()
    }
}
