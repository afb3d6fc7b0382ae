use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

/// The two fixed contracts the dashboard talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    /// MasterChef-style staking pool.
    pub pool: Address,
    /// Token held by the user and staked into the pool.
    pub token: Address,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadCallError {
    #[error("{method} call failed: {message}")]
    Call { method: &'static str, message: String },
}

impl ReadCallError {
    pub fn call(method: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Call {
            method,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteCallError {
    #[error("{method} was rejected by the wallet: {message}")]
    Rejected { method: &'static str, message: String },
    #[error("{method} reverted in transaction {tx_hash}")]
    Reverted { method: &'static str, tx_hash: B256 },
    #[error("{method} failed: {message}")]
    Transport { method: &'static str, message: String },
}

impl WriteCallError {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Rejected { method, .. }
            | Self::Reverted { method, .. }
            | Self::Transport { method, .. } => method,
        }
    }
}

/// Typed calls against the staking pool and its token, bound to one account.
///
/// Reads return smallest-unit integers. Writes are signed by [`account`](Self::account)
/// and resolve only once the receipt is available.
#[async_trait]
pub trait StakingGateway: Send + Sync {
    fn account(&self) -> Address;

    /// `token.balanceOf(account)`
    async fn token_balance(&self) -> Result<U256, ReadCallError>;
    /// `token.allowance(account, pool)`
    async fn allowance(&self) -> Result<U256, ReadCallError>;
    /// Reward accrued in the pool and not yet harvested.
    async fn pending_reward(&self) -> Result<U256, ReadCallError>;
    /// `pool.userInfo(account).amount`
    async fn staked_amount(&self) -> Result<U256, ReadCallError>;
    /// Everything deposited by every user: `token.balanceOf(pool)`.
    async fn total_staked(&self) -> Result<U256, ReadCallError>;

    async fn approve(&self, amount: U256) -> Result<TxOutcome, WriteCallError>;
    async fn deposit(&self, amount: U256) -> Result<TxOutcome, WriteCallError>;
    async fn withdraw(&self, amount: U256) -> Result<TxOutcome, WriteCallError>;

    /// Settle pending rewards.
    ///
    /// MasterChef pools pay out on every `deposit`, so a zero-amount deposit is
    /// a harvest. That is a property of the deployed contract and is not
    /// checked here.
    async fn harvest(&self) -> Result<TxOutcome, WriteCallError> {
        self.deposit(U256::ZERO).await
    }
}
