//! Contract deployment helpers
use alloy::primitives::{Address, Bytes, TxKind, U256};

use crate::{
    error::{FrameworkError, Result},
    identity::Identity,
    provider::LedgerClient,
    receipt::Receipt,
};

/// Deploy `code` from `deployer` (with logging)
pub(crate) async fn deploy(
    name: &str,
    client: &LedgerClient,
    deployer: &Identity,
    code: Bytes,
    gas_limit: u64,
) -> Result<(Address, Receipt)> {
    tracing::info!("deploying {name}");
    let pending = client
        .send_legacy(deployer, TxKind::Create, U256::ZERO, code, gas_limit)
        .await
        .map_err(|err| match err {
            FrameworkError::TransactionSubmission(source) => FrameworkError::DeploymentFailed {
                tx_hash: None,
                reason: source.to_string(),
            },
            other => other,
        })?;
    let tx_hash = *pending.tx_hash();
    tracing::info!(%tx_hash, "waiting for tx to be mined");

    let receipt = client.wait(pending).await?;
    if let Some(gas_used) = receipt.gas_used {
        tracing::info!(%gas_used, %tx_hash, "tx mined");
    }
    if !receipt.succeeded() {
        tracing::error!(%tx_hash, "deployment of {name} reverted");
        return Err(FrameworkError::DeploymentFailed {
            tx_hash: Some(tx_hash),
            reason: "transaction reverted".to_string(),
        });
    }
    let addr = receipt
        .contract_address
        .ok_or_else(|| FrameworkError::DeploymentFailed {
            tx_hash: Some(tx_hash),
            reason: "receipt carries no contract address".to_string(),
        })?;

    tracing::info!("deployed {name} at {addr:#x}");
    Ok((addr, receipt))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256, Bytes};
    use serde_json::json;

    use super::deploy;
    use crate::{
        error::FrameworkError,
        identity::Identity,
        provider::tests::{mocked_client, push_tx_params},
        receipt::tests::receipt_json,
    };

    #[tokio::test]
    async fn test_deploy_reads_contract_address() {
        let (client, asserter) = mocked_client();
        let deployer = Identity::generate().unwrap();
        let addr = Address::repeat_byte(0xdd);
        let mut receipt = receipt_json("0x1", json!([]));
        receipt["contractAddress"] = json!(addr);
        push_tx_params(&asserter);
        asserter.push_success(&B256::repeat_byte(0x11));
        asserter.push_success(&receipt);

        let (deployed, receipt) = deploy(
            "Storage",
            &client,
            &deployer,
            Bytes::from_static(&[0x00]),
            1_000_000,
        )
        .await
        .unwrap();
        assert_eq!(deployed, addr);
        assert!(receipt.succeeded());
    }

    #[tokio::test]
    async fn test_deploy_failures() {
        let cases = [
            ("0x0", json!(Address::repeat_byte(0xdd))),
            ("0x1", json!(null)),
        ];
        for (status, contract_address) in cases {
            let (client, asserter) = mocked_client();
            let mut receipt = receipt_json(status, json!([]));
            receipt["contractAddress"] = contract_address;
            push_tx_params(&asserter);
            asserter.push_success(&B256::repeat_byte(0x11));
            asserter.push_success(&receipt);

            let err = deploy(
                "Storage",
                &client,
                &Identity::generate().unwrap(),
                Bytes::from_static(&[0x00]),
                1_000_000,
            )
            .await
            .unwrap_err();
            assert!(
                matches!(err, FrameworkError::DeploymentFailed { tx_hash: Some(_), .. }),
                "{err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_deploy_rejected_by_node() {
        let (client, asserter) = mocked_client();
        push_tx_params(&asserter);
        asserter.push_failure_msg("insufficient funds for gas * price + value");

        let err = deploy(
            "Storage",
            &client,
            &Identity::generate().unwrap(),
            Bytes::from_static(&[0x00]),
            1_000_000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FrameworkError::DeploymentFailed { tx_hash: None, .. }));
    }
}
