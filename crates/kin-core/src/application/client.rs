//! # Kin Client
//!
//! Wires a [`LedgerGateway`] to the resolver, submitter and event
//! multiplexer, and hands out [`KinAccount`]s sharing them.

use super::account::KinAccount;
use super::resolver::AccountStateResolver;
use super::submitter::TransactionSubmitter;
use crate::adapters::HorizonGateway;
use crate::config::ClientConfig;
use crate::domain::KinError;
use crate::events::{BlockchainEvents, EventDispatcher, EventMultiplexer, InlineDispatcher};
use crate::ports::LedgerGateway;
use kin_crypto::KeyPair;
use kin_types::{Address, Asset, Network};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

pub struct KinClient {
    config: ClientConfig,
    network: Network,
    gateway: Arc<dyn LedgerGateway>,
    resolver: Arc<AccountStateResolver>,
    submitter: Arc<TransactionSubmitter>,
    multiplexer: EventMultiplexer,
    runtime: Handle,
}

impl KinClient {
    /// Listener callbacks run inline on the stream task until
    /// [`KinClient::with_dispatcher`] says otherwise.
    pub fn new(
        config: ClientConfig,
        gateway: Arc<dyn LedgerGateway>,
        runtime: Handle,
    ) -> Result<Self, KinError> {
        config.validate()?;
        let asset = config.asset()?;
        let network = config.network();
        if let Err(err) = kin_telemetry::register_metrics() {
            warn!(error = %err, "Metrics unavailable");
        }

        let resolver = Arc::new(AccountStateResolver::new(gateway.clone(), asset));
        let submitter = Arc::new(TransactionSubmitter::new(
            gateway.clone(),
            resolver.clone(),
            network.clone(),
            config.base_fee,
        ));
        let multiplexer = EventMultiplexer::new(
            gateway.clone(),
            resolver.clone(),
            config.stream.clone(),
            runtime.clone(),
            Arc::new(InlineDispatcher),
        );

        info!(
            network = network.passphrase(),
            asset = %resolver.asset(),
            "Kin client ready"
        );

        Ok(Self {
            config,
            network,
            gateway,
            resolver,
            submitter,
            multiplexer,
            runtime,
        })
    }

    /// Client over the Horizon HTTP API at `config.horizon_url`.
    pub fn with_horizon(config: ClientConfig, runtime: Handle) -> Result<Self, KinError> {
        let gateway = HorizonGateway::new(config.horizon_url.clone(), config.connect_timeout())?;
        Self::new(config, Arc::new(gateway), runtime)
    }

    /// Run listener callbacks through `dispatcher`.
    ///
    /// Applies to accounts obtained afterwards.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.multiplexer = EventMultiplexer::new(
            self.gateway.clone(),
            self.resolver.clone(),
            self.config.stream.clone(),
            self.runtime.clone(),
            dispatcher,
        );
        self
    }

    /// Bind `keypair` to this client.
    pub fn account(&self, keypair: KeyPair) -> KinAccount {
        let address = Address::from(keypair.public_key());
        KinAccount::new(
            keypair,
            self.resolver.clone(),
            self.submitter.clone(),
            self.events(address),
            self.runtime.clone(),
        )
    }

    /// Event registration for any address, including ones without a keypair.
    pub fn events(&self, address: Address) -> BlockchainEvents {
        BlockchainEvents::new(self.multiplexer.clone(), address)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn asset(&self) -> &Asset {
        self.resolver.asset()
    }

    pub fn gateway(&self) -> Arc<dyn LedgerGateway> {
        self.gateway.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;
    use crate::config::ConfigError;
    use crate::ports::KinAccountApi;
    use kin_types::AccountStatus;

    #[tokio::test]
    async fn test_client_over_memory_ledger() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = KinClient::new(ledger.client_config(), ledger.clone(), Handle::current()).unwrap();
        assert_eq!(client.asset(), ledger.asset());

        let account = client.account(KeyPair::generate());
        assert_eq!(account.status().await.unwrap(), AccountStatus::NotCreated);

        ledger.create_account(&account.address()).unwrap();
        account.activate().await.unwrap();
        assert_eq!(account.status().await.unwrap(), AccountStatus::Activated);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut config = ledger.client_config();
        config.asset_issuer = "not-an-address".to_string();

        let result = KinClient::new(config, ledger, Handle::current());
        assert!(matches!(
            result,
            Err(KinError::Config(ConfigError::Invalid {
                field: "asset_issuer",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_sync_call_inside_runtime_is_refused() {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = KinClient::new(ledger.client_config(), ledger.clone(), Handle::current()).unwrap();
        let account = client.account(KeyPair::generate());

        assert_eq!(account.status_sync(), Err(KinError::BlockingInAsyncContext));
    }
}
