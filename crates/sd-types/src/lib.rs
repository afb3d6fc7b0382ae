use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the user asked to reach a wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectStrategy {
    /// Wallet living next to the page (browser extension, local signer).
    Injected,
    /// Remote wallet paired through a bridge relay.
    Relay,
}

impl ConnectStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for ConnectStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "injected" | "metamask" => Ok(Self::Injected),
            "relay" | "walletconnect" => Ok(Self::Relay),
            other => Err(format!("unknown connect strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Approve,
    Deposit,
    Withdraw,
    Harvest,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Harvest => "harvest",
        }
    }
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the history table, already in display units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: String,
    pub user: String,
    pub event_type: String,
    pub amount_wei: String,
    pub amount: String,
    pub timestamp: i64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryStatus {
    Loading,
    Loaded { rows: Vec<HistoryRow> },
    Failed { message: String },
}

impl Default for HistoryStatus {
    fn default() -> Self {
        Self::Loading
    }
}

/// Everything the page needs to render, taken from the view state in one read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub phase: ConnectionPhase,
    pub strategy: Option<ConnectStrategy>,
    pub pairing_uri: Option<String>,
    pub account: Option<String>,
    pub short_account: Option<String>,
    pub chain_id: Option<u64>,
    pub balance: Option<String>,
    pub token_earned: Option<String>,
    pub token_staked: Option<String>,
    pub total_staked: Option<String>,
    pub approved: bool,
    pub show_stake_controls: bool,
    pub history: HistoryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub action: WriteAction,
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_accepts_connector_aliases() {
        assert_eq!("MetaMask".parse::<ConnectStrategy>(), Ok(ConnectStrategy::Injected));
        assert_eq!("walletconnect".parse::<ConnectStrategy>(), Ok(ConnectStrategy::Relay));
        assert!("ledger".parse::<ConnectStrategy>().is_err());
    }

    #[test]
    fn history_status_is_tagged() {
        let json = serde_json::to_value(HistoryStatus::Failed {
            message: "boom".to_owned(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
