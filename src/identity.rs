//! Signing identities bound to contract handles

use std::fmt;

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    primitives::{Address, B256},
    signers::{
        SignerSync,
        local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    },
};
use rand::{TryRngCore, rngs::OsRng};

use crate::error::{FrameworkError, Result};

/// A private key held in memory together with its account address.
#[derive(Clone)]
pub struct Identity {
    signer: PrivateKeySigner,
}

impl Identity {
    /// Parse a hex-encoded secp256k1 private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(FrameworkError::InvalidKey)?;
        Ok(Self { signer })
    }

    /// Generate a fresh key from the operating system's entropy source.
    pub fn generate() -> Result<Self> {
        let mut secret = B256::ZERO;
        OsRng
            .try_fill_bytes(secret.as_mut_slice())
            .map_err(|err| FrameworkError::KeyGeneration(err.to_string()))?;
        let signer = PrivateKeySigner::from_bytes(&secret)
            .map_err(|err| FrameworkError::KeyGeneration(err.to_string()))?;
        Ok(Self { signer })
    }

    /// Derive the key at `account_index` from a BIP-39 English mnemonic.
    pub fn from_mnemonic(phrase: impl Into<String>, account_index: u32) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.into())
            .index(account_index)
            .map_err(FrameworkError::InvalidKey)?
            .build()
            .map_err(FrameworkError::InvalidKey)?;
        Ok(Self { signer })
    }

    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Raw private scalar, for protocols that sign on the holder's behalf.
    pub fn export_raw(&self) -> B256 {
        self.signer.to_bytes()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Sign a legacy transaction (EIP-155 when `chain_id` is set).
    pub fn sign_transaction(&self, tx: TxLegacy) -> Result<TxEnvelope> {
        let signature = self.signer.sign_hash_sync(&tx.signature_hash())?;
        Ok(TxEnvelope::from(tx.into_signed(signature)))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
