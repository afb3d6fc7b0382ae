//! Connection lifecycle and the read batch.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use sd_chain_client::{ReadCallError, StakingGateway};
use sd_history::HistorySource;
use sd_types::{ConnectStrategy, ConnectionPhase, DashboardSnapshot, HistoryStatus};
use sd_wallet::{ConnectionError, PairingListener};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{Store, ViewState};

/// Wallet activated for the dashboard: who, where, and how to reach the contracts.
#[derive(Clone)]
pub struct ActiveWallet {
    pub account: Address,
    pub chain_id: u64,
    pub gateway: Arc<dyn StakingGateway>,
}

/// Turns a connect request into an [`ActiveWallet`].
#[async_trait]
pub trait WalletPort: Send + Sync {
    async fn activate(
        &self,
        strategy: ConnectStrategy,
        pairing: &dyn PairingListener,
    ) -> Result<ActiveWallet, ConnectionError>;
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Show stake controls even before an allowance exists.
    pub bypass_approval_gate: bool,
    /// Re-issue the read batch after every successful write.
    pub refresh_after_write: bool,
    pub deposit_amount: String,
    pub withdraw_amount: String,
    pub approve_amount: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            bypass_approval_gate: true,
            refresh_after_write: false,
            deposit_amount: "0.01".to_owned(),
            withdraw_amount: "0.002".to_owned(),
            approve_amount: "0.01".to_owned(),
        }
    }
}

/// Handles of one read batch. Dropping it leaves the reads running.
pub struct RefreshBatch {
    epoch: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshBatch {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait until every read has landed (or been dropped).
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!("dashboard read task failed: {err}");
            }
        }
    }
}

/// Owns the view state and drives it from wallet, chain and indexer.
#[derive(Clone)]
pub struct DashboardController {
    pub(crate) store: Arc<RwLock<Store>>,
    pub(crate) wallets: Arc<dyn WalletPort>,
    pub(crate) history: Arc<dyn HistorySource>,
    pub(crate) options: Arc<ControllerOptions>,
}

struct StorePairing {
    store: Arc<RwLock<Store>>,
}

#[async_trait]
impl PairingListener for StorePairing {
    async fn on_pairing(&self, uri: &str) {
        let mut store = self.store.write().await;
        if store.view.phase == ConnectionPhase::Connecting {
            store.view.pairing_uri = Some(uri.to_owned());
        }
    }
}

impl DashboardController {
    pub fn new(
        wallets: Arc<dyn WalletPort>,
        history: Arc<dyn HistorySource>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            wallets,
            history,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Render-time view. Never issues a read.
    pub async fn view(&self) -> DashboardSnapshot {
        self.store
            .read()
            .await
            .view
            .snapshot(self.options.bypass_approval_gate)
    }

    /// Activate a wallet with `strategy`.
    ///
    /// Returns the read batch when the account changed; reconnecting the same
    /// account keeps the slots it already has. A failure is only logged: the
    /// view falls back to the live connection, or to Disconnected if there is
    /// none and no other attempt is pending.
    pub async fn connect(
        &self,
        strategy: ConnectStrategy,
    ) -> Result<Option<RefreshBatch>, ConnectionError> {
        {
            let mut store = self.store.write().await;
            if store.view.phase != ConnectionPhase::Connected {
                store.view.phase = ConnectionPhase::Connecting;
            }
            store.view.strategy = Some(strategy);
            store.view.pairing_uri = None;
            store.pending_attempts += 1;
        }
        info!(%strategy, "activating wallet");

        let listener = StorePairing {
            store: self.store.clone(),
        };
        let wallet = match self.wallets.activate(strategy, &listener).await {
            Ok(wallet) => wallet,
            Err(err) => {
                warn!(%strategy, "wallet activation failed: {err}");
                self.store.write().await.settle_failed_attempt();
                return Err(err);
            }
        };

        let epoch = {
            let mut store = self.store.write().await;
            store.pending_attempts = store.pending_attempts.saturating_sub(1);
            store.view.phase = ConnectionPhase::Connected;
            store.view.strategy = Some(strategy);
            store.view.pairing_uri = None;
            store.view.chain_id = Some(wallet.chain_id);
            store.gateway = Some(wallet.gateway.clone());
            store.connected_strategy = Some(strategy);
            if store.view.account == Some(wallet.account) {
                None
            } else {
                Some(store.view.switch_account(wallet.account))
            }
        };
        info!(account = %wallet.account, chain_id = wallet.chain_id, "wallet connected");

        Ok(epoch.map(|epoch| self.spawn_reads(epoch, wallet.account, wallet.gateway)))
    }

    /// Re-issue the read batch for the current account, keeping its slots
    /// until fresh values land.
    pub async fn refresh(&self) -> Option<RefreshBatch> {
        let (epoch, account, gateway) = {
            let store = self.store.read().await;
            (store.view.epoch, store.view.account?, store.gateway.clone()?)
        };
        Some(self.spawn_reads(epoch, account, gateway))
    }

    /// Six independent reads. None waits on another and each writes only its
    /// own slot.
    fn spawn_reads(
        &self,
        epoch: u64,
        account: Address,
        gateway: Arc<dyn StakingGateway>,
    ) -> RefreshBatch {
        debug!(epoch, %account, "issuing dashboard reads");
        let mut tasks = Vec::with_capacity(6);

        let g = gateway.clone();
        tasks.push(self.spawn_amount(
            epoch,
            "balance",
            async move { g.token_balance().await },
            |view, v| view.balance = Some(v),
        ));
        let g = gateway.clone();
        tasks.push(self.spawn_amount(
            epoch,
            "token earned",
            async move { g.pending_reward().await },
            |view, v| view.token_earned = Some(v),
        ));
        let g = gateway.clone();
        tasks.push(self.spawn_amount(
            epoch,
            "stake",
            async move { g.staked_amount().await },
            |view, v| view.token_staked = Some(v),
        ));
        let g = gateway.clone();
        tasks.push(self.spawn_amount(
            epoch,
            "total staked",
            async move { g.total_staked().await },
            |view, v| view.total_staked = Some(v),
        ));

        let store = self.store.clone();
        let g = gateway;
        tasks.push(tokio::spawn(async move {
            match g.allowance().await {
                Ok(allowance) => {
                    write_slot(&store, epoch, "allowance", |view| {
                        view.approved = allowance > U256::ZERO
                    })
                    .await
                }
                Err(err) => warn!("allowance read failed: {err}"),
            }
        }));

        let store = self.store.clone();
        let history = self.history.clone();
        tasks.push(tokio::spawn(async move {
            let status = match history.fetch_events().await {
                Ok(events) => HistoryStatus::Loaded {
                    rows: sd_history::rows_for_account(events, &account.to_string()),
                },
                Err(err) => {
                    warn!("history query failed: {err}");
                    HistoryStatus::Failed {
                        message: err.to_string(),
                    }
                }
            };
            write_slot(&store, epoch, "history", |view| view.history = status).await;
        }));

        RefreshBatch { epoch, tasks }
    }

    fn spawn_amount<F, S>(&self, epoch: u64, slot: &'static str, read: F, set: S) -> JoinHandle<()>
    where
        F: Future<Output = Result<U256, ReadCallError>> + Send + 'static,
        S: FnOnce(&mut ViewState, String) + Send + 'static,
    {
        let store = self.store.clone();
        tokio::spawn(async move {
            match read.await {
                Ok(value) => {
                    let shown = sd_units::u256_to_decimal(value);
                    write_slot(&store, epoch, slot, |view| set(view, shown)).await;
                }
                Err(err) => warn!("{slot} read failed: {err}"),
            }
        })
    }
}

/// Apply `update` only while `epoch` is still the current one.
pub(crate) async fn write_slot(
    store: &RwLock<Store>,
    epoch: u64,
    slot: &'static str,
    update: impl FnOnce(&mut ViewState),
) {
    let mut store = store.write().await;
    if store.view.epoch == epoch {
        update(&mut store.view);
    } else {
        debug!(epoch, current = store.view.epoch, "dropping stale {slot} result");
    }
}
