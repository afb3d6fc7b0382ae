use alloy::network::EthereumWallet;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use sd_types::ConnectStrategy;
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::{ConnectionError, Connector, NetworkConfig, PairingListener, Session};

/// Wallet that lives next to the page: a local signing key in front of the
/// node the page was pointed at.
pub struct InjectedConnector {
    rpc_url: Url,
    signer: Option<PrivateKeySigner>,
    networks: Arc<NetworkConfig>,
}

impl InjectedConnector {
    /// `signer_key` is a hex private key. Without one, every activation is
    /// rejected, the way an extension without an unlocked account would.
    pub fn new(
        rpc_url: Url,
        signer_key: Option<&str>,
        networks: Arc<NetworkConfig>,
    ) -> Result<Self, ConnectionError> {
        let signer = signer_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| {
                key.parse::<PrivateKeySigner>().map_err(|_| {
                    ConnectionError::InvalidConfig(
                        "signer key is not a valid private key".to_owned(),
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            rpc_url,
            signer,
            networks,
        })
    }
}

#[async_trait]
impl Connector for InjectedConnector {
    fn strategy(&self) -> ConnectStrategy {
        ConnectStrategy::Injected
    }

    async fn activate(&self, _pairing: &dyn PairingListener) -> Result<Session, ConnectionError> {
        let Some(signer) = self.signer.clone() else {
            return Err(ConnectionError::Rejected("no unlocked account".to_owned()));
        };
        let account = signer.address();

        let chain_id = ProviderBuilder::new()
            .connect_http(self.rpc_url.clone())
            .get_chain_id()
            .await
            .map_err(ConnectionError::transport)?;
        self.networks.ensure_supported(chain_id)?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone())
            .erased();

        info!(%account, chain_id, "injected wallet activated");

        Ok(Session {
            strategy: ConnectStrategy::Injected,
            account,
            chain_id,
            reader: provider.clone(),
            sender: provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IgnorePairing;
    use crate::test_rpc::spawn_node;

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn networks() -> Arc<NetworkConfig> {
        Arc::new(NetworkConfig::infura("key", &[1, 4, 5]).unwrap())
    }

    #[tokio::test]
    async fn rejects_without_signer_key() {
        let url = "http://127.0.0.1:9".parse().unwrap();
        let connector = InjectedConnector::new(url, None, networks()).unwrap();
        let err = connector.activate(&IgnorePairing).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Rejected(_)));
    }

    #[test]
    fn invalid_key_is_a_config_error() {
        let result = InjectedConnector::new(
            "http://127.0.0.1:9".parse().unwrap(),
            Some("not-a-key"),
            networks(),
        );
        assert!(matches!(result, Err(ConnectionError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn rejects_chain_outside_allow_list() -> anyhow::Result<()> {
        let addr = spawn_node(137, vec![]).await;
        let connector =
            InjectedConnector::new(format!("http://{addr}").parse()?, Some(DEV_KEY), networks())?;

        let err = connector.activate(&IgnorePairing).await.unwrap_err();
        assert!(matches!(err, ConnectionError::UnsupportedChain(137)));
        Ok(())
    }

    #[tokio::test]
    async fn activates_on_allowed_chain() -> anyhow::Result<()> {
        let addr = spawn_node(5, vec![]).await;
        let connector =
            InjectedConnector::new(format!("http://{addr}").parse()?, Some(DEV_KEY), networks())?;

        let session = connector.activate(&IgnorePairing).await?;
        assert_eq!(session.chain_id, 5);
        assert_eq!(session.account, DEV_ADDRESS.parse::<alloy::primitives::Address>()?);
        assert_eq!(session.strategy, ConnectStrategy::Injected);
        Ok(())
    }
}
