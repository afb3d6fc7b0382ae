use async_trait::async_trait;
use sd_chain_client::ContractAddresses;
use sd_chain_evm::EvmStakingGateway;
use sd_dashboard::{ActiveWallet, WalletPort};
use sd_types::ConnectStrategy;
use sd_wallet::{
    ConnectionError, ConnectorRegistry, InjectedConnector, NetworkConfig, PairingListener,
    RelayConnector,
};
use std::sync::Arc;

use crate::config::AppConfig;

/// Connectors for both strategies, each activation bound to the staking contracts.
pub(crate) struct ContractWallets {
    registry: ConnectorRegistry,
    contracts: ContractAddresses,
}

impl ContractWallets {
    pub(crate) fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let networks = Arc::new(NetworkConfig::infura(
            &config.infura_key,
            &config.supported_chains,
        )?);

        let mut registry = ConnectorRegistry::default();
        registry.register(Arc::new(InjectedConnector::new(
            config.injected_rpc_url.clone(),
            config.signer_key.as_deref().map(String::as_str),
            networks.clone(),
        )?));
        registry.register(Arc::new(RelayConnector::new(
            config.relay_url.clone(),
            networks,
            config.relay_timeout,
        )));

        Ok(Self {
            registry,
            contracts: config.contracts,
        })
    }
}

#[async_trait]
impl WalletPort for ContractWallets {
    async fn activate(
        &self,
        strategy: ConnectStrategy,
        pairing: &dyn PairingListener,
    ) -> Result<ActiveWallet, ConnectionError> {
        let session = self.registry.activate(strategy, pairing).await?;
        Ok(ActiveWallet {
            account: session.account,
            chain_id: session.chain_id,
            gateway: Arc::new(EvmStakingGateway::bind(&session, self.contracts)),
        })
    }
}
