//! Staking dashboard controller.
//!
//! `state` holds what the page renders, `controller` connects wallets and
//! fills the state with one batch of reads per account, `wallet_ops` runs the
//! stake actions.

mod controller;
mod state;
mod wallet_ops;

pub use controller::{
    ActiveWallet, ControllerOptions, DashboardController, RefreshBatch, WalletPort,
};
pub use wallet_ops::ActionError;
