use std::collections::BTreeMap;
use url::Url;

use crate::ConnectionError;

/// Allow-listed chains and the read-only node used for each of them.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    rpc_urls: BTreeMap<u64, Url>,
}

impl NetworkConfig {
    pub fn new(rpc_urls: BTreeMap<u64, Url>) -> Self {
        Self { rpc_urls }
    }

    /// Infura endpoints for `chains`, all sharing one project key.
    pub fn infura(project_key: &str, chains: &[u64]) -> Result<Self, ConnectionError> {
        let mut rpc_urls = BTreeMap::new();
        for &chain_id in chains {
            let network = match chain_id {
                1 => "mainnet",
                4 => "rinkeby",
                5 => "goerli",
                11_155_111 => "sepolia",
                other => {
                    return Err(ConnectionError::InvalidConfig(format!(
                        "no infura network for chain id {other}"
                    )));
                }
            };
            let url = format!("https://{network}.infura.io/v3/{project_key}")
                .parse()
                .map_err(|err| ConnectionError::InvalidConfig(format!("rpc url: {err}")))?;
            rpc_urls.insert(chain_id, url);
        }
        Ok(Self { rpc_urls })
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.rpc_urls.contains_key(&chain_id)
    }

    pub fn rpc_url(&self, chain_id: u64) -> Option<&Url> {
        self.rpc_urls.get(&chain_id)
    }

    pub(crate) fn ensure_supported(&self, chain_id: u64) -> Result<(), ConnectionError> {
        if self.is_supported(chain_id) {
            Ok(())
        } else {
            Err(ConnectionError::UnsupportedChain(chain_id))
        }
    }
}
