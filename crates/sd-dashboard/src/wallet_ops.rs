//! Stake actions.
//!
//! Each action is a single contract write followed by its receipt. Failures
//! are logged and leave the view untouched. Only a successful approve changes
//! a slot on its own; everything else waits for the next read batch.

use alloy::primitives::{Address, U256};
use sd_chain_client::{TxOutcome, WriteCallError};
use sd_types::{ActionReceipt, WriteAction};
use sd_units::UnitsError;
use tracing::{error, info};

use crate::controller::{DashboardController, write_slot};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("no wallet connected")]
    NotConnected,
    #[error("{action} amount: {source}")]
    InvalidAmount {
        action: WriteAction,
        #[source]
        source: UnitsError,
    },
    #[error(transparent)]
    Write(#[from] WriteCallError),
}

/// A mined write and the connection it was sent on.
struct Submitted {
    outcome: TxOutcome,
    epoch: u64,
    account: Address,
}

impl DashboardController {
    pub async fn approve(&self, amount: Option<&str>) -> Result<ActionReceipt, ActionError> {
        self.run(WriteAction::Approve, amount).await
    }

    pub async fn deposit(&self, amount: Option<&str>) -> Result<ActionReceipt, ActionError> {
        self.run(WriteAction::Deposit, amount).await
    }

    pub async fn withdraw(&self, amount: Option<&str>) -> Result<ActionReceipt, ActionError> {
        self.run(WriteAction::Withdraw, amount).await
    }

    /// Zero-amount deposit.
    pub async fn harvest(&self) -> Result<ActionReceipt, ActionError> {
        self.run(WriteAction::Harvest, None).await
    }

    /// Run `action`. A blank or missing `amount` falls back to the configured default.
    pub async fn run(
        &self,
        action: WriteAction,
        amount: Option<&str>,
    ) -> Result<ActionReceipt, ActionError> {
        match self.submit(action, amount).await {
            Ok(Submitted {
                outcome,
                epoch,
                account,
            }) => {
                info!(
                    %action,
                    %account,
                    tx_hash = %outcome.tx_hash,
                    gas_used = outcome.gas_used,
                    "stake action confirmed"
                );
                if action == WriteAction::Approve {
                    write_slot(&self.store, epoch, "approval", |view| {
                        if view.account == Some(account) {
                            view.approved = true;
                        }
                    })
                    .await;
                }
                if self.options.refresh_after_write {
                    // Reads land in the background like any other batch.
                    drop(self.refresh().await);
                }
                Ok(ActionReceipt {
                    action,
                    tx_hash: outcome.tx_hash.to_string(),
                    block_number: outcome.block_number,
                })
            }
            Err(err) => {
                error!(%action, "stake action failed: {err}");
                Err(err)
            }
        }
    }

    async fn submit(
        &self,
        action: WriteAction,
        amount: Option<&str>,
    ) -> Result<Submitted, ActionError> {
        let (gateway, epoch) = {
            let store = self.store.read().await;
            let Some(gateway) = store.gateway.clone() else {
                return Err(ActionError::NotConnected);
            };
            (gateway, store.view.epoch)
        };

        let outcome = match action {
            WriteAction::Approve => gateway.approve(self.amount(action, amount)?).await?,
            WriteAction::Deposit => gateway.deposit(self.amount(action, amount)?).await?,
            WriteAction::Withdraw => gateway.withdraw(self.amount(action, amount)?).await?,
            WriteAction::Harvest => gateway.harvest().await?,
        };
        Ok(Submitted {
            outcome,
            epoch,
            account: gateway.account(),
        })
    }

    fn amount(&self, action: WriteAction, amount: Option<&str>) -> Result<U256, ActionError> {
        let fallback = match action {
            WriteAction::Approve => &self.options.approve_amount,
            WriteAction::Deposit => &self.options.deposit_amount,
            WriteAction::Withdraw => &self.options.withdraw_amount,
            WriteAction::Harvest => return Ok(U256::ZERO),
        };
        let decimal = amount
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(fallback.as_str());
        sd_units::to_wei(decimal).map_err(|source| ActionError::InvalidAmount { action, source })
    }
}
