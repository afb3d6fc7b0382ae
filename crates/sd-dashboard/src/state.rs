//! View state shared by the controller, its background reads and the renderer.
//!
//! Every slot starts unset and is filled by exactly one read of the current
//! batch. A batch is tagged with the epoch it was issued under; results tagged
//! with an older epoch are dropped.

use alloy::primitives::Address;
use sd_chain_client::StakingGateway;
use sd_types::{ConnectStrategy, ConnectionPhase, DashboardSnapshot, HistoryStatus};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ViewState {
    pub phase: ConnectionPhase,
    pub strategy: Option<ConnectStrategy>,
    pub pairing_uri: Option<String>,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    /// Bumped whenever the account changes.
    pub epoch: u64,

    // ── Read slots ──
    pub balance: Option<String>,
    pub token_earned: Option<String>,
    pub token_staked: Option<String>,
    pub total_staked: Option<String>,
    pub approved: bool,
    pub history: HistoryStatus,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            strategy: None,
            pairing_uri: None,
            account: None,
            chain_id: None,
            epoch: 0,
            balance: None,
            token_earned: None,
            token_staked: None,
            total_staked: None,
            approved: false,
            history: HistoryStatus::Loading,
        }
    }
}

impl ViewState {
    /// Move to a new account: clear every read slot and open a new epoch.
    pub fn switch_account(&mut self, account: Address) -> u64 {
        self.account = Some(account);
        self.balance = None;
        self.token_earned = None;
        self.token_staked = None;
        self.total_staked = None;
        self.approved = false;
        self.history = HistoryStatus::Loading;
        self.epoch += 1;
        self.epoch
    }

    pub fn snapshot(&self, bypass_approval_gate: bool) -> DashboardSnapshot {
        let account = self.account.map(|a| a.to_string());
        DashboardSnapshot {
            phase: self.phase,
            strategy: self.strategy,
            pairing_uri: self.pairing_uri.clone(),
            short_account: account.as_deref().map(sd_units::shorten_address),
            account,
            chain_id: self.chain_id,
            balance: self.balance.clone(),
            token_earned: self.token_earned.clone(),
            token_staked: self.token_staked.clone(),
            total_staked: self.total_staked.clone(),
            approved: self.approved,
            show_stake_controls: self.approved || bypass_approval_gate,
            history: self.history.clone(),
        }
    }
}

/// View state plus the live connection.
#[derive(Default)]
pub(crate) struct Store {
    pub view: ViewState,
    pub gateway: Option<Arc<dyn StakingGateway>>,
    /// Strategy that produced `gateway`.
    pub connected_strategy: Option<ConnectStrategy>,
    /// Connect attempts still waiting on their wallet.
    pub pending_attempts: usize,
}

impl Store {
    /// Close out a failed connect. While another attempt is still pending the
    /// phase is left to it; otherwise the view goes back to the live
    /// connection if there is one, else to Disconnected.
    pub fn settle_failed_attempt(&mut self) {
        self.pending_attempts = self.pending_attempts.saturating_sub(1);
        if self.pending_attempts > 0 {
            return;
        }
        self.view.pairing_uri = None;
        if self.gateway.is_some() {
            self.view.phase = ConnectionPhase::Connected;
            self.view.strategy = self.connected_strategy;
        } else {
            self.view.phase = ConnectionPhase::Disconnected;
            self.view.strategy = None;
        }
    }
}
