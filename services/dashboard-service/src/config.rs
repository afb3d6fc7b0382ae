use alloy::primitives::Address;
use anyhow::{Context, bail};
use sd_chain_client::ContractAddresses;
use sd_dashboard::ControllerOptions;
use sd_history::HistoryQuery;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;
use zeroize::Zeroizing;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MASTERCHEF_ADDR: &str = "0x9da687e88b0A807e57f1913bCD31D56c49C872c2";
const DEFAULT_TOKEN_ADDR: &str = "0xc778417e063141139fce010982780140aa0cd5ab";
const DEFAULT_INFURA_KEY: &str = "a6acbc3588c3406a9cce03f6a762121f";
const DEFAULT_SUPPORTED_CHAINS: &str = "1,4,5";
const DEFAULT_RELAY_URL: &str = "https://bridge.walletconnect.org";
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_INJECTED_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_SUBGRAPH_URL: &str = "http://localhost:8000/subgraphs/name/stakedeck";

/// Process-wide settings, read once before the first request.
pub(crate) struct AppConfig {
    pub(crate) listen_addr: SocketAddr,
    pub(crate) contracts: ContractAddresses,
    pub(crate) infura_key: String,
    pub(crate) supported_chains: Vec<u64>,
    pub(crate) relay_url: Url,
    pub(crate) relay_timeout: Duration,
    pub(crate) injected_rpc_url: Url,
    pub(crate) signer_key: Option<Zeroizing<String>>,
    pub(crate) subgraph_url: String,
    pub(crate) history_query: HistoryQuery,
    pub(crate) controller: ControllerOptions,
}

impl AppConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |suffix: &str| {
            lookup(&format!("STAKEDECK_{suffix}"))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let or = |suffix: &str, default: &str| var(suffix).unwrap_or_else(|| default.to_owned());

        let listen_addr = or("LISTEN_ADDR", DEFAULT_LISTEN_ADDR)
            .parse::<SocketAddr>()
            .context("STAKEDECK_LISTEN_ADDR must be host:port")?;

        let contracts = ContractAddresses {
            pool: parse_address(
                "STAKEDECK_MASTERCHEF_ADDR",
                &or("MASTERCHEF_ADDR", DEFAULT_MASTERCHEF_ADDR),
            )?,
            token: parse_address("STAKEDECK_TOKEN_ADDR", &or("TOKEN_ADDR", DEFAULT_TOKEN_ADDR))?,
        };

        let supported_chains = or("SUPPORTED_CHAINS", DEFAULT_SUPPORTED_CHAINS)
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<u64>().with_context(|| {
                    format!("STAKEDECK_SUPPORTED_CHAINS: '{id}' is not a chain id")
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        if supported_chains.is_empty() {
            bail!("STAKEDECK_SUPPORTED_CHAINS must name at least one chain");
        }

        let relay_timeout = match var("RELAY_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .context("STAKEDECK_RELAY_TIMEOUT_SECS must be whole seconds")?,
            None => DEFAULT_RELAY_TIMEOUT_SECS,
        };

        let mut history_query = HistoryQuery::default();
        if let Some(entity) = var("HISTORY_ENTITY") {
            history_query.entity = entity;
        }
        if let Some(first) = var("HISTORY_FIRST") {
            history_query.first = match first.as_str() {
                "0" | "all" => None,
                n => Some(
                    n.parse::<u32>()
                        .context("STAKEDECK_HISTORY_FIRST must be a page size")?,
                ),
            };
        }

        let flag = |suffix: &str, default: bool| parse_flag(suffix, var(suffix), default);
        let amount = |suffix: &str, default: String| checked_amount(suffix, var(suffix), default);
        let defaults = ControllerOptions::default();
        let controller = ControllerOptions {
            bypass_approval_gate: flag("BYPASS_APPROVAL_GATE", true)?,
            refresh_after_write: flag("REFRESH_AFTER_WRITE", false)?,
            deposit_amount: amount("DEPOSIT_AMOUNT", defaults.deposit_amount)?,
            withdraw_amount: amount("WITHDRAW_AMOUNT", defaults.withdraw_amount)?,
            approve_amount: amount("APPROVE_AMOUNT", defaults.approve_amount)?,
        };

        Ok(Self {
            listen_addr,
            contracts,
            infura_key: or("INFURA_KEY", DEFAULT_INFURA_KEY),
            supported_chains,
            relay_url: or("RELAY_URL", DEFAULT_RELAY_URL)
                .parse::<Url>()
                .context("STAKEDECK_RELAY_URL must be a URL")?,
            relay_timeout: Duration::from_secs(relay_timeout),
            injected_rpc_url: or("INJECTED_RPC_URL", DEFAULT_INJECTED_RPC_URL)
                .parse::<Url>()
                .context("STAKEDECK_INJECTED_RPC_URL must be a URL")?,
            signer_key: var("SIGNER_KEY").map(Zeroizing::new),
            subgraph_url: or("SUBGRAPH_URL", DEFAULT_SUBGRAPH_URL),
            history_query,
            controller,
        })
    }
}

fn parse_address(name: &str, value: &str) -> anyhow::Result<Address> {
    value
        .parse::<Address>()
        .with_context(|| format!("{name}: '{value}' is not an address"))
}

fn parse_flag(suffix: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("STAKEDECK_{suffix}: '{other}' is not a boolean"),
    }
}

fn checked_amount(suffix: &str, value: Option<String>, default: String) -> anyhow::Result<String> {
    let amount = value.unwrap_or(default);
    sd_units::to_wei(&amount).with_context(|| format!("STAKEDECK_{suffix}"))?;
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_deployment() -> anyhow::Result<()> {
        let config = config(&[])?;
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.supported_chains, vec![1, 4, 5]);
        assert_eq!(config.relay_timeout, Duration::from_secs(120));
        assert_eq!(config.relay_url.as_str(), "https://bridge.walletconnect.org/");
        assert!(config.signer_key.is_none());
        assert_eq!(config.history_query, HistoryQuery::default());
        assert!(config.controller.bypass_approval_gate);
        assert!(!config.controller.refresh_after_write);
        assert_eq!(config.controller.withdraw_amount, "0.002");
        assert_eq!(
            config.contracts.pool,
            "0x9da687e88b0A807e57f1913bCD31D56c49C872c2".parse::<Address>()?
        );
        Ok(())
    }

    #[test]
    fn overrides_are_applied() -> anyhow::Result<()> {
        let config = config(&[
            ("STAKEDECK_SUPPORTED_CHAINS", "5, 11155111"),
            ("STAKEDECK_BYPASS_APPROVAL_GATE", "false"),
            ("STAKEDECK_REFRESH_AFTER_WRITE", "1"),
            ("STAKEDECK_HISTORY_FIRST", "all"),
            ("STAKEDECK_DEPOSIT_AMOUNT", "0.5"),
            ("STAKEDECK_SIGNER_KEY", "0xabc"),
        ])?;
        assert_eq!(config.supported_chains, vec![5, 11155111]);
        assert!(!config.controller.bypass_approval_gate);
        assert!(config.controller.refresh_after_write);
        assert_eq!(config.history_query.first, None);
        assert_eq!(config.controller.deposit_amount, "0.5");
        assert_eq!(config.signer_key.as_deref().map(String::as_str), Some("0xabc"));
        Ok(())
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(config(&[("STAKEDECK_TOKEN_ADDR", "0x12")]).is_err());
        assert!(config(&[("STAKEDECK_SUPPORTED_CHAINS", "mainnet")]).is_err());
        assert!(config(&[("STAKEDECK_BYPASS_APPROVAL_GATE", "maybe")]).is_err());
        assert!(config(&[("STAKEDECK_WITHDRAW_AMOUNT", "-1")]).is_err());
        assert!(config(&[("STAKEDECK_LISTEN_ADDR", "nowhere")]).is_err());
    }
}
