//! Contract handles bound to a signing identity

use std::sync::Arc;

use alloy::{
    dyn_abi::{DecodedEvent, DynSolValue, EventExt, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::Log,
};
use tracing::{debug, error};

use crate::{
    confidential::ConfidentialComputeRequest,
    error::{FrameworkError, Result},
    identity::Identity,
    provider::{LedgerClient, PendingTransaction},
    receipt::Receipt,
};

/// A deployed contract, its interface, and the identity that signs for it.
///
/// Handles are immutable; [`Contract::with_identity`] returns a new handle.
#[derive(Debug, Clone)]
pub struct Contract {
    address: Address,
    abi: Arc<JsonAbi>,
    identity: Identity,
    client: LedgerClient,
    kettle: Address,
    gas_limit: u64,
}

impl Contract {
    pub(crate) fn new(
        address: Address,
        abi: Arc<JsonAbi>,
        identity: Identity,
        client: LedgerClient,
        kettle: Address,
        gas_limit: u64,
    ) -> Self {
        Self {
            address,
            abi,
            identity,
            client,
            kettle,
            gas_limit,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Same contract, signed for by `identity`. Performs no I/O.
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    /// ABI-encode `method(args...)`, resolving overloads by argument types.
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes> {
        self.encode_input(method, args).map(|(_, input)| input)
    }

    /// Decode the return data of `method` against its declared outputs.
    pub fn decode_output(&self, method: &str, data: &[u8]) -> Result<Vec<DynSolValue>> {
        let overloads = self.abi.function(method).ok_or_else(|| FrameworkError::Decoding {
            method: method.to_string(),
            reason: "method not in ABI".to_string(),
        })?;
        let mut last_err = None;
        for function in overloads {
            match function.abi_decode_output(data) {
                Ok(values) => return Ok(values),
                Err(err) => last_err = Some(err.to_string()),
            }
        }
        Err(FrameworkError::Decoding {
            method: method.to_string(),
            reason: last_err.unwrap_or_default(),
        })
    }

    /// Decode `log` as event `name` of this contract's ABI.
    ///
    /// Overloaded events are tried in declaration order; the first one whose
    /// signature and shape match wins.
    pub fn decode_event(&self, name: &str, log: &Log) -> Result<DecodedEvent> {
        let overloads = self.abi.event(name).ok_or_else(|| FrameworkError::Decoding {
            method: name.to_string(),
            reason: "event not in ABI".to_string(),
        })?;
        let mut last_err = None;
        for event in overloads {
            match event.decode_log(log.data()) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => last_err = Some(err.to_string()),
            }
        }
        Err(FrameworkError::Decoding {
            method: name.to_string(),
            reason: last_err.unwrap_or_default(),
        })
    }

    /// Read-only call of `method(args...)` against the current state.
    pub async fn call(&self, method: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let (function, input) = self.encode_input(method, args)?;
        let output = self
            .client
            .call(Some(self.identity.address()), self.address, input)
            .await?;
        decode_with(function, &output)
    }

    /// Submit `method(args...)` as a confidential compute request.
    ///
    /// `confidential_inputs` reach the kettle alongside the request and never
    /// appear in the public calldata. Resolves once the resulting transaction
    /// is mined successfully.
    pub async fn send_transaction(
        &self,
        method: &str,
        args: &[DynSolValue],
        confidential_inputs: impl Into<Bytes>,
    ) -> Result<Receipt> {
        let (_, calldata) = self.encode_input(method, args)?;
        let sender = self.identity.address();
        let nonce = self.client.nonce(sender).await?;
        let gas_price = self.client.gas_price().await?;
        let chain_id = self.client.chain_id().await?;

        let request = ConfidentialComputeRequest::new(
            nonce,
            gas_price,
            self.gas_limit,
            self.address,
            calldata,
            self.kettle,
            chain_id,
            confidential_inputs.into(),
        );
        debug!(
            %sender,
            contract = %self.address,
            method,
            kettle = %self.kettle,
            "sending confidential compute request"
        );
        let signed = request.sign(self.identity.signer())?;
        let pending = self.client.send_raw_transaction(&signed.encoded()).await?;
        self.confirm(method, pending).await
    }

    /// Submit `method(args...)` as a plain signed transaction.
    pub async fn transact(&self, method: &str, args: &[DynSolValue]) -> Result<Receipt> {
        let (_, calldata) = self.encode_input(method, args)?;
        let pending = self
            .client
            .send_legacy(
                &self.identity,
                TxKind::Call(self.address),
                U256::ZERO,
                calldata,
                self.gas_limit,
            )
            .await?;
        self.confirm(method, pending).await
    }

    async fn confirm(&self, method: &str, pending: PendingTransaction) -> Result<Receipt> {
        let receipt = self.client.wait(pending).await?;
        if !receipt.succeeded() {
            error!(tx_hash = %receipt.transaction_hash, method, "transaction reverted");
            return Err(FrameworkError::TransactionReverted {
                tx_hash: receipt.transaction_hash,
            });
        }
        Ok(receipt)
    }

    fn encode_input(&self, method: &str, args: &[DynSolValue]) -> Result<(&Function, Bytes)> {
        let encoding = |reason: String| FrameworkError::Encoding {
            method: method.to_string(),
            reason,
        };
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| encoding("method not in ABI".to_string()))?;

        let mut last_err = None;
        for function in overloads.iter().filter(|f| f.inputs.len() == args.len()) {
            match function.abi_encode_input(args) {
                Ok(input) => return Ok((function, input.into())),
                Err(err) => last_err = Some(err.to_string()),
            }
        }
        Err(encoding(last_err.unwrap_or_else(|| {
            format!("no overload takes {} arguments", args.len())
        })))
    }
}

fn decode_with(function: &Function, output: &[u8]) -> Result<Vec<DynSolValue>> {
    function
        .abi_decode_output(output)
        .map_err(|err| FrameworkError::Decoding {
            method: function.name.clone(),
            reason: err.to_string(),
        })
}
