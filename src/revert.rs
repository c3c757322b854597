//! Decoder for structured reverts carried inside textual node errors.
//!
//! A kettle that fails to process a confidential compute request answers
//! `eth_sendRawTransaction` with the message `execution reverted: 0x<hex>`,
//! where `<hex>` is an ABI-encoded `PeekerReverted(address, bytes)` error.

use alloy::{
    hex,
    primitives::{Address, Bytes},
    sol_types::SolError,
};

use crate::sol_types::PeekerReverted;

pub const EXECUTION_REVERTED_PREFIX: &str = "execution reverted: 0x";

/// Outcome of inspecting a node error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// The peeker at `peeker` rejected the request with `message`.
    PeekerReverted { peeker: Address, message: Bytes },
    /// The message does not carry a revert envelope we understand.
    Unrecognized,
}

/// Whether `msg` follows the `execution reverted: 0x<hex>` envelope.
pub fn is_revert_envelope(msg: &str) -> bool {
    msg.strip_prefix(EXECUTION_REVERTED_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Decode the revert envelope in `msg`, never guessing on malformed input.
pub fn decode(msg: &str) -> RevertReason {
    if !is_revert_envelope(msg) {
        return RevertReason::Unrecognized;
    }
    let Ok(data) = hex::decode(&msg[EXECUTION_REVERTED_PREFIX.len()..]) else {
        return RevertReason::Unrecognized;
    };
    if data.len() < 4 || data[..4] != PeekerReverted::SELECTOR {
        return RevertReason::Unrecognized;
    }
    match PeekerReverted::abi_decode_raw(&data[4..]) {
        Ok(err) => RevertReason::PeekerReverted {
            peeker: err.peeker,
            message: err.message,
        },
        Err(err) => {
            tracing::debug!(%err, "revert envelope with undecodable payload");
            RevertReason::Unrecognized
        }
    }
}
