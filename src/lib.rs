//! Contract deployment and confidential compute transactions for SUAVE.
//!
//! This crate loads compiled contract artifacts, deploys them through a
//! kettle's JSON-RPC endpoint, and submits both plain transactions and
//! confidential compute requests from typed contract handles. Failures are
//! reported through [`FrameworkError`], which keeps structured peeker
//! rejections apart from silent on-chain reverts and transport errors.

pub mod artifact;
pub mod confidential;
pub mod contract;
mod deployer;
pub mod error;
pub mod framework;
pub mod identity;
pub mod provider;
pub mod receipt;
pub mod revert;
mod sol_types;

pub use artifact::Artifact;
pub use contract::Contract;
pub use error::{FrameworkError, Result};
pub use framework::{Config, Framework};
pub use identity::Identity;
pub use provider::{LedgerClient, PendingTransaction, WaitConfig};
pub use receipt::Receipt;
pub use revert::RevertReason;
pub use sol_types::PeekerReverted;

pub use alloy::dyn_abi::DynSolValue;
