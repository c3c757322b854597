//! Confidential compute requests.
//!
//! A request pairs a signed record, whose calldata is public, with
//! confidential inputs that travel next to the record and are committed to
//! only by hash. The kettle named in the record executes the request
//! off-chain with access to the inputs and settles the result on-chain.

use alloy::{
    primitives::{Address, B256, Bytes, Signature, U256, keccak256},
    rlp::{BufMut, Encodable, Header},
    signers::SignerSync,
};

/// Transaction type byte used when hashing a record for signing.
pub const CONFIDENTIAL_COMPUTE_RECORD_TX_TYPE: u8 = 0x42;
/// Transaction type byte of a request on the wire.
pub const CONFIDENTIAL_COMPUTE_REQUEST_TX_TYPE: u8 = 0x43;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidentialComputeRecord {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub kettle_address: Address,
    pub confidential_inputs_hash: B256,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidentialComputeRequest {
    pub record: ConfidentialComputeRecord,
    pub confidential_inputs: Bytes,
}

/// A request together with the signature over its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedConfidentialRequest {
    request: ConfidentialComputeRequest,
    signature: Signature,
}

impl ConfidentialComputeRequest {
    /// Build a request, committing to `confidential_inputs` in the record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nonce: u64,
        gas_price: u128,
        gas: u64,
        to: Address,
        data: Bytes,
        kettle_address: Address,
        chain_id: u64,
        confidential_inputs: Bytes,
    ) -> Self {
        let record = ConfidentialComputeRecord {
            nonce,
            gas_price,
            gas,
            to,
            value: U256::ZERO,
            data,
            kettle_address,
            confidential_inputs_hash: keccak256(&confidential_inputs),
            chain_id,
        };
        Self {
            record,
            confidential_inputs,
        }
    }

    /// Hash signed by the sender: `keccak256(0x42 || rlp(fields))`.
    pub fn signature_hash(&self) -> B256 {
        let r = &self.record;
        let fields: [&dyn Encodable; 9] = [
            &r.kettle_address,
            &r.confidential_inputs_hash,
            &r.nonce,
            &r.gas_price,
            &r.gas,
            &r.to,
            &r.value,
            &r.data,
            &r.chain_id,
        ];
        let mut buf = vec![CONFIDENTIAL_COMPUTE_RECORD_TX_TYPE];
        encode_list(&fields, &mut buf);
        keccak256(buf)
    }

    pub fn sign<S: SignerSync>(self, signer: &S) -> alloy::signers::Result<SignedConfidentialRequest> {
        let signature = signer.sign_hash_sync(&self.signature_hash())?;
        Ok(SignedConfidentialRequest {
            request: self,
            signature,
        })
    }
}

impl SignedConfidentialRequest {
    pub fn request(&self) -> &ConfidentialComputeRequest {
        &self.request
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Wire encoding: `0x43 || rlp([rlp(record || v, r, s), confidential_inputs])`.
    pub fn encoded(&self) -> Vec<u8> {
        let r = &self.request.record;
        let v = u64::from(self.signature.v());
        let (sig_r, sig_s) = (self.signature.r(), self.signature.s());
        let fields: [&dyn Encodable; 12] = [
            &r.nonce,
            &r.gas_price,
            &r.gas,
            &r.to,
            &r.value,
            &r.data,
            &r.kettle_address,
            &r.confidential_inputs_hash,
            &r.chain_id,
            &v,
            &sig_r,
            &sig_s,
        ];
        let mut record = Vec::new();
        encode_list(&fields, &mut record);

        let inputs = &self.request.confidential_inputs;
        let mut out = vec![CONFIDENTIAL_COMPUTE_REQUEST_TX_TYPE];
        Header {
            list: true,
            payload_length: record.len() + inputs.length(),
        }
        .encode(&mut out);
        out.put_slice(&record);
        inputs.encode(&mut out);
        out
    }
}

fn encode_list(fields: &[&dyn Encodable], out: &mut dyn BufMut) {
    let payload_length = fields.iter().map(|f| f.length()).sum();
    Header {
        list: true,
        payload_length,
    }
    .encode(out);
    for field in fields {
        field.encode(out);
    }
}
