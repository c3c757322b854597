//! Solidity types for contract interaction

use alloy::sol;

sol! {
    /// Raised by the kettle when a peeker contract rejects a confidential
    /// compute request during off-chain execution.
    #[derive(Debug, PartialEq, Eq)]
    error PeekerReverted(address peeker, bytes message);
}

#[cfg(test)]
sol! {
    #[derive(Debug, PartialEq, Eq)]
    event SecretSet(uint256 teamNumber, bytes32 dataID);

    #[derive(Debug, PartialEq, Eq)]
    event AttemptResult(uint256 teamNumber, bool success);

    #[derive(Debug, PartialEq, Eq)]
    event Heartbeat(uint256 round, bytes32 tag, uint64 at) anonymous;
}
