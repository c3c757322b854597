//! Network configuration and the composition root

use std::{path::PathBuf, sync::Arc, time::Duration};

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, TxKind, U256, address},
    providers::Provider,
    transports::http::reqwest::Url,
};
use tracing::{error, info};

use crate::{
    artifact::Artifact,
    contract::Contract,
    deployer,
    error::{FrameworkError, Result},
    identity::Identity,
    provider::{LedgerClient, WaitConfig},
};

const RIGIL_RPC: &str = "https://rpc.rigil.suave.flashbots.net";
const RIGIL_KETTLE: Address = address!("0x03493869959c866713c33669ca118e774a30a0e5");
// prefunded on the public devnets, 0xBE69d72ca5f88aCba033a063dF5DBe43a4148De0
const DEVNET_FUNDED_KEY: &str = "bab10e221a04567ca0445fb7570843ce36da5177bd8f33584f972d299fe74bfb";

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// JSON-RPC endpoint of the kettle
    pub kettle_rpc: Url,
    /// Kettle that executes confidential compute requests
    pub kettle_addr: Address,
    /// Pays for deployments and funding transfers
    pub funded_account: Identity,
    /// Root of compiled artifacts (`out/` in a forge project)
    pub artifacts_dir: PathBuf,
    pub gas_limit: u64,
    pub transfer_gas_limit: u64,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Config {
    pub fn new(kettle_rpc: Url, kettle_addr: Address, funded_account: Identity) -> Self {
        let wait = WaitConfig::default();
        Self {
            kettle_rpc,
            kettle_addr,
            funded_account,
            artifacts_dir: PathBuf::from("out"),
            gas_limit: 10_000_000,
            transfer_gas_limit: 21_000,
            receipt_timeout: wait.timeout,
            poll_interval: wait.poll_interval,
        }
    }

    /// Like [`Config::new`], parsing the endpoint and key from strings.
    pub fn from_endpoint(
        kettle_rpc: &str,
        kettle_addr: Address,
        funded_key: &str,
    ) -> Result<Self> {
        let url = Url::parse(kettle_rpc).map_err(|err| FrameworkError::InvalidEndpoint {
            url: kettle_rpc.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(url, kettle_addr, Identity::from_hex(funded_key)?))
    }

    /// Public Rigil testnet with the shared devnet account.
    pub fn rigil() -> Result<Self> {
        Self::from_endpoint(RIGIL_RPC, RIGIL_KETTLE, DEVNET_FUNDED_KEY)
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.receipt_timeout, self.poll_interval)
    }
}

/// Owns the node connection and creates contract handles.
#[derive(Debug, Clone)]
pub struct Framework {
    config: Config,
    client: LedgerClient,
}

impl Framework {
    /// Build a framework without contacting the node; connection problems
    /// surface as errors of the first operation.
    pub fn new(config: Config) -> Self {
        let client = LedgerClient::http(config.kettle_rpc.clone(), config.wait_config());
        Self { config, client }
    }

    /// Like [`Framework::new`], but fails early if the node does not answer.
    pub async fn connect(config: Config) -> Result<Self> {
        let framework = Self::new(config);
        match framework.client.provider().get_chain_id().await {
            Ok(chain_id) => {
                info!(url = %framework.config.kettle_rpc, chain_id, "connected to node");
                Ok(framework)
            }
            Err(source) => {
                error!(url = %framework.config.kettle_rpc, %source, "node unreachable");
                Err(FrameworkError::Connection {
                    url: framework.config.kettle_rpc.to_string(),
                    source,
                })
            }
        }
    }

    /// Use an existing client, e.g. one over a mocked transport.
    pub fn with_client(config: Config, client: LedgerClient) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    /// Load `path` from the artifacts directory and deploy it from the
    /// funded account.
    pub async fn deploy_contract(&self, path: &str) -> Result<Contract> {
        let artifact = Artifact::load(&self.config.artifacts_dir, path)?;
        self.deploy_named(path, artifact).await
    }

    pub async fn deploy_artifact(&self, artifact: Artifact) -> Result<Contract> {
        self.deploy_named("contract", artifact).await
    }

    async fn deploy_named(&self, name: &str, artifact: Artifact) -> Result<Contract> {
        let (addr, _) = deployer::deploy(
            name,
            &self.client,
            &self.config.funded_account,
            artifact.code,
            self.config.gas_limit,
        )
        .await?;
        Ok(self.contract_at(addr, Arc::new(artifact.abi), self.config.funded_account.clone()))
    }

    /// Handle to an already deployed contract, signed for by `identity`.
    pub fn contract_at(&self, address: Address, abi: Arc<JsonAbi>, identity: Identity) -> Contract {
        Contract::new(
            address,
            abi,
            identity,
            self.client.clone(),
            self.config.kettle_addr,
            self.config.gas_limit,
        )
    }

    /// Transfer `value` from the funded account and check that `to` ends
    /// up holding exactly `value`.
    pub async fn fund_account(&self, to: Address, value: U256) -> Result<()> {
        let pending = self
            .client
            .send_legacy(
                &self.config.funded_account,
                TxKind::Call(to),
                value,
                Default::default(),
                self.config.transfer_gas_limit,
            )
            .await?;
        let receipt = self.client.wait(pending).await?;
        if !receipt.succeeded() {
            error!(tx_hash = %receipt.transaction_hash, %to, "funding transfer reverted");
            return Err(FrameworkError::TransactionReverted {
                tx_hash: receipt.transaction_hash,
            });
        }

        let balance = self.client.balance_at(to).await?;
        if balance != value {
            error!(%to, %value, %balance, "funding left unexpected balance");
            return Err(FrameworkError::FundingFailed {
                address: to,
                expected: value,
                actual: balance,
            });
        }
        info!(%to, %value, "funded account");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use alloy::{
        dyn_abi::DynSolValue,
        node_bindings::{Anvil, AnvilInstance},
        primitives::{Address, B256, U256, address},
        providers::Provider,
        signers::local::PrivateKeySigner,
    };
    use serde_json::json;
    use tempfile::TempDir;

    use super::{Config, Framework};
    use crate::{
        artifact::tests::{STORAGE_BYTECODE, storage_artifact_json},
        error::FrameworkError,
        identity::Identity,
        provider::tests::{mocked_client, push_tx_params},
        receipt::tests::receipt_json,
    };

    fn mocked_framework() -> (Framework, alloy::transports::mock::Asserter) {
        let (client, asserter) = mocked_client();
        let config = Config::new(
            "http://localhost:8545".parse().unwrap(),
            Address::repeat_byte(0x0e),
            Identity::generate().unwrap(),
        );
        (Framework::with_client(config, client), asserter)
    }

    #[test]
    fn test_rigil_config() {
        let config = Config::rigil().unwrap();
        assert_eq!(config.kettle_rpc.as_str(), "https://rpc.rigil.suave.flashbots.net/");
        assert_eq!(
            config.kettle_addr,
            address!("0x03493869959c866713c33669ca118e774a30a0e5")
        );
        assert_eq!(
            config.funded_account.address(),
            address!("0xbe69d72ca5f88acba033a063df5dbe43a4148de0")
        );
        assert_eq!(config.gas_limit, 10_000_000);
    }

    #[tokio::test]
    async fn test_fund_account_detects_partial_funding() {
        let (fr, asserter) = mocked_framework();
        let to = address!("0xabc0000000000000000000000000000000000abc");
        push_tx_params(&asserter);
        asserter.push_success(&B256::repeat_byte(0x11));
        asserter.push_success(&receipt_json("0x1", json!([])));
        asserter.push_success(&U256::from(900));

        let err = fr.fund_account(to, U256::from(1000)).await.unwrap_err();
        match err {
            FrameworkError::FundingFailed {
                address,
                expected,
                actual,
            } => {
                assert_eq!(address, to);
                assert_eq!(expected, U256::from(1000));
                assert_eq!(actual, U256::from(900));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fund_account_reverted_transfer() {
        let (fr, asserter) = mocked_framework();
        let hash = B256::repeat_byte(0x11);
        push_tx_params(&asserter);
        asserter.push_success(&hash);
        asserter.push_success(&receipt_json("0x0", json!([])));
        // the target already holds the amount, so only the receipt reveals the failure
        asserter.push_success(&U256::from(1000));

        let err = fr
            .fund_account(Address::repeat_byte(0xab), U256::from(1000))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::TransactionReverted { tx_hash } if tx_hash == hash));
    }

    #[tokio::test]
    async fn test_fund_account_exact_balance() {
        let (fr, asserter) = mocked_framework();
        push_tx_params(&asserter);
        asserter.push_success(&B256::repeat_byte(0x11));
        asserter.push_success(&receipt_json("0x1", json!([])));
        asserter.push_success(&U256::from(1000));

        fr.fund_account(Address::repeat_byte(0xab), U256::from(1000))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let (fr, _) = mocked_framework();
        let dir = tempfile::tempdir().unwrap();
        let fr = Framework::with_client(
            fr.config().clone().with_artifacts_dir(dir.path()),
            fr.client().clone(),
        );
        let err = fr.deploy_contract("Nope.sol/Nope.json").await.unwrap_err();
        assert!(matches!(err, FrameworkError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_connect_unreachable_node() {
        let config = Config::new(
            "http://127.0.0.1:1".parse().unwrap(),
            Address::ZERO,
            Identity::generate().unwrap(),
        );
        let err = Framework::connect(config).await.unwrap_err();
        assert!(matches!(err, FrameworkError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_deferred_connection_fails_on_first_use() {
        let config = Config::new(
            "http://127.0.0.1:1".parse().unwrap(),
            Address::ZERO,
            Identity::generate().unwrap(),
        );
        let fr = Framework::new(config);

        let err = fr
            .fund_account(Address::repeat_byte(0xab), U256::from(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::RemoteCall(_)), "{err:?}");
    }

    #[test]
    fn test_invalid_endpoint() {
        let key = Identity::generate().unwrap().export_raw().to_string();
        let err = Config::from_endpoint("not a url", Address::ZERO, &key).unwrap_err();
        assert!(matches!(err, FrameworkError::InvalidEndpoint { .. }), "{err:?}");

        let config = Config::from_endpoint("http://localhost:8545", Address::ZERO, &key).unwrap();
        assert_eq!(config.kettle_rpc.as_str(), "http://localhost:8545/");
    }

    /// Spawn anvil and connect a framework funded by its first account, with
    /// the storage artifact written under a temporary artifacts directory.
    async fn init_test_framework() -> anyhow::Result<(AnvilInstance, TempDir, Framework)> {
        let anvil = Anvil::new().try_spawn()?;
        let funded = Identity::from_signer(PrivateKeySigner::from(anvil.keys()[0].clone()));
        let dir = tempfile::tempdir()?;
        let sub = dir.path().join("Storage.sol");
        std::fs::create_dir_all(&sub)?;
        std::fs::write(sub.join("Storage.json"), storage_artifact_json())?;

        let config = Config::new(anvil.endpoint_url(), Address::ZERO, funded)
            .with_artifacts_dir(dir.path())
            .with_gas_limit(1_000_000)
            .with_poll_interval(Duration::from_millis(100));
        let fr = Framework::connect(config).await?;
        Ok((anvil, dir, fr))
    }

    #[tokio::test]
    async fn test_deploy_set_and_get_value() {
        let (_anvil, _dir, fr) = init_test_framework().await.unwrap();

        let contract = fr.deploy_contract("Storage.sol/Storage.json").await.unwrap();
        let code = fr
            .client()
            .provider()
            .get_code_at(contract.address())
            .await
            .unwrap();
        assert_eq!(STORAGE_BYTECODE.len() - 2, 2 * (code.len() + 11));

        contract
            .transact("setValue", &[DynSolValue::Uint(U256::from(42), 256)])
            .await
            .unwrap();
        let values = contract.call("getValue", &[]).await.unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(42), 256)]);

        // another identity sees the same contract state
        let user = Identity::generate().unwrap();
        fr.fund_account(user.address(), U256::from(10).pow(U256::from(18)))
            .await
            .unwrap();
        let as_user = contract.with_identity(user.clone());
        assert_eq!(as_user.address(), contract.address());
        as_user
            .transact("setValue", &[DynSolValue::Uint(U256::from(7), 256)])
            .await
            .unwrap();
        assert_eq!(
            contract.call("getValue", &[]).await.unwrap(),
            vec![DynSolValue::Uint(U256::from(7), 256)]
        );

        let abi = Arc::new(contract.abi().clone());
        let again = fr.contract_at(contract.address(), abi, user);
        assert_eq!(
            again.call("getValue", &[]).await.unwrap(),
            vec![DynSolValue::Uint(U256::from(7), 256)]
        );
    }
}
