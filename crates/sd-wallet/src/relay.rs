use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use sd_types::ConnectStrategy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::{ConnectionError, Connector, NetworkConfig, PairingListener, Session};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One pairing attempt with a remote wallet.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub topic: Uuid,
    pub key: [u8; 32],
}

impl Pairing {
    pub fn new() -> Self {
        Self {
            topic: Uuid::new_v4(),
            key: rand::random(),
        }
    }

    /// `wc:<topic>@1?bridge=<bridge>&key=<hex>`, the string a wallet scans.
    pub fn uri(&self, bridge: &Url) -> String {
        let bridge: String =
            url::form_urlencoded::byte_serialize(bridge.as_str().as_bytes()).collect();
        format!(
            "wc:{}@1?bridge={}&key={}",
            self.topic,
            bridge,
            alloy::hex::encode(self.key)
        )
    }

    /// JSON-RPC endpoint the relay exposes for this topic once a wallet joins.
    pub fn endpoint(&self, bridge: &Url) -> Result<Url, ConnectionError> {
        format!("{}/{}", bridge.as_str().trim_end_matches('/'), self.topic)
            .parse()
            .map_err(|err| ConnectionError::InvalidConfig(format!("relay endpoint: {err}")))
    }
}

impl Default for Pairing {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote wallet reached through a bridge relay.
pub struct RelayConnector {
    bridge: Url,
    networks: Arc<NetworkConfig>,
    timeout: Duration,
    poll_interval: Duration,
}

impl RelayConnector {
    pub fn new(bridge: Url, networks: Arc<NetworkConfig>, timeout: Duration) -> Self {
        Self {
            bridge,
            networks,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn wait_for_account(&self, relay: &DynProvider) -> Address {
        loop {
            match relay.get_accounts().await {
                Ok(accounts) => {
                    if let Some(account) = accounts.first() {
                        return *account;
                    }
                }
                Err(err) => debug!("relay not paired yet: {err}"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Connector for RelayConnector {
    fn strategy(&self) -> ConnectStrategy {
        ConnectStrategy::Relay
    }

    async fn activate(&self, pairing: &dyn PairingListener) -> Result<Session, ConnectionError> {
        let attempt = Pairing::new();
        let uri = attempt.uri(&self.bridge);
        info!(topic = %attempt.topic, "relay pairing published: {uri}");
        pairing.on_pairing(&uri).await;

        let relay = ProviderBuilder::new()
            .connect_http(attempt.endpoint(&self.bridge)?)
            .erased();

        let account = tokio::time::timeout(self.timeout, self.wait_for_account(&relay))
            .await
            .map_err(|_| ConnectionError::RelayTimeout(self.timeout))?;

        let chain_id = relay
            .get_chain_id()
            .await
            .map_err(ConnectionError::transport)?;
        self.networks.ensure_supported(chain_id)?;
        let Some(rpc_url) = self.networks.rpc_url(chain_id) else {
            return Err(ConnectionError::UnsupportedChain(chain_id));
        };

        let reader = ProviderBuilder::new().connect_http(rpc_url.clone()).erased();

        info!(%account, chain_id, "relay wallet paired");

        Ok(Session {
            strategy: ConnectStrategy::Relay,
            account,
            chain_id,
            reader,
            sender: relay,
        })
    }
}
