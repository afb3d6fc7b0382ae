//! Wallet connection strategies.
//!
//! Every strategy ends in the same place: an authenticated account, the chain
//! it is on, and the RPC handles the rest of the app uses for that account.
//! Connectors are built once at startup and shared read-only.

mod injected;
mod network;
mod relay;

pub use injected::InjectedConnector;
pub use network::NetworkConfig;
pub use relay::{Pairing, RelayConnector};

use alloy::primitives::Address;
use alloy::providers::DynProvider;
use async_trait::async_trait;
use sd_types::ConnectStrategy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("wallet rejected the connection: {0}")]
    Rejected(String),
    #[error("unsupported chain id {0}")]
    UnsupportedChain(u64),
    #[error("relay pairing timed out after {0:?}")]
    RelayTimeout(Duration),
    #[error("wallet transport error: {0}")]
    Transport(String),
    #[error("invalid wallet configuration: {0}")]
    InvalidConfig(String),
    #[error("no connector registered for strategy {0}")]
    UnknownStrategy(ConnectStrategy),
}

impl ConnectionError {
    pub(crate) fn transport(err: impl fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// An activated wallet.
///
/// `reader` serves read-only chain state, `sender` signs and submits
/// transactions for `account`. For an injected wallet both are the same
/// handle; a relay session reads from the public node for its chain and sends
/// through the relay.
#[derive(Clone)]
pub struct Session {
    pub strategy: ConnectStrategy,
    pub account: Address,
    pub chain_id: u64,
    pub reader: DynProvider,
    pub sender: DynProvider,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("strategy", &self.strategy)
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Receives the pairing URI a relay connector publishes before it waits for
/// the remote wallet.
#[async_trait]
pub trait PairingListener: Send + Sync {
    async fn on_pairing(&self, uri: &str);
}

/// Listener for strategies that never pair.
pub struct IgnorePairing;

#[async_trait]
impl PairingListener for IgnorePairing {
    async fn on_pairing(&self, _uri: &str) {}
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn strategy(&self) -> ConnectStrategy;
    async fn activate(&self, pairing: &dyn PairingListener) -> Result<Session, ConnectionError>;
}

#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<ConnectStrategy, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.strategy(), connector);
    }

    pub fn connector(&self, strategy: ConnectStrategy) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&strategy).cloned()
    }

    pub async fn activate(
        &self,
        strategy: ConnectStrategy,
        pairing: &dyn PairingListener,
    ) -> Result<Session, ConnectionError> {
        let Some(connector) = self.connector(strategy) else {
            return Err(ConnectionError::UnknownStrategy(strategy));
        };
        connector.activate(pairing).await
    }
}

#[cfg(test)]
pub(crate) mod test_rpc {
    //! Minimal JSON-RPC node for connector tests.

    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};
    use std::net::SocketAddr;

    /// Serve `eth_chainId` and `eth_accounts` on every path.
    pub(crate) async fn spawn_node(chain_id: u64, accounts: Vec<String>) -> SocketAddr {
        let handler = move |Json(request): Json<Value>| {
            let accounts = accounts.clone();
            async move {
                let result = match request["method"].as_str() {
                    Some("eth_chainId") => json!(format!("0x{chain_id:x}")),
                    Some("eth_accounts") => json!(accounts),
                    _ => Value::Null,
                };
                Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
            }
        };
        let app = Router::new()
            .route("/", post(handler.clone()))
            .route("/{topic}", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}
