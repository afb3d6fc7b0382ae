use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use sd_chain_client::{ContractAddresses, ReadCallError, StakingGateway, TxOutcome, WriteCallError};
use sd_wallet::Session;
use tracing::{info, warn};

sol! {
    #[sol(rpc)]
    interface IStakingToken {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IMasterChef {
        function deposit(uint256 amount) external;
        function withdraw(uint256 amount) external;
        function pendingDD2(address user) external view returns (uint256);
        function userInfo(address user) external view returns (uint256 amount, uint256 rewardDebt);
    }
}

/// Staking gateway over an EVM JSON-RPC session.
///
/// Built once per connection: the contract instances keep the session's
/// providers for the lifetime of the Connected state.
pub struct EvmStakingGateway {
    account: Address,
    contracts: ContractAddresses,
    token_reader: IStakingToken::IStakingTokenInstance<DynProvider>,
    pool_reader: IMasterChef::IMasterChefInstance<DynProvider>,
    token_sender: IStakingToken::IStakingTokenInstance<DynProvider>,
    pool_sender: IMasterChef::IMasterChefInstance<DynProvider>,
}

impl EvmStakingGateway {
    pub fn bind(session: &Session, contracts: ContractAddresses) -> Self {
        Self {
            account: session.account,
            contracts,
            token_reader: IStakingToken::new(contracts.token, session.reader.clone()),
            pool_reader: IMasterChef::new(contracts.pool, session.reader.clone()),
            token_sender: IStakingToken::new(contracts.token, session.sender.clone()),
            pool_sender: IMasterChef::new(contracts.pool, session.sender.clone()),
        }
    }
}

#[async_trait]
impl StakingGateway for EvmStakingGateway {
    fn account(&self) -> Address {
        self.account
    }

    async fn token_balance(&self) -> Result<U256, ReadCallError> {
        self.token_reader
            .balanceOf(self.account)
            .call()
            .await
            .map_err(|err| ReadCallError::call("balanceOf", err))
    }

    async fn allowance(&self) -> Result<U256, ReadCallError> {
        self.token_reader
            .allowance(self.account, self.contracts.pool)
            .call()
            .await
            .map_err(|err| ReadCallError::call("allowance", err))
    }

    async fn pending_reward(&self) -> Result<U256, ReadCallError> {
        self.pool_reader
            .pendingDD2(self.account)
            .call()
            .await
            .map_err(|err| ReadCallError::call("pendingDD2", err))
    }

    async fn staked_amount(&self) -> Result<U256, ReadCallError> {
        let info = self
            .pool_reader
            .userInfo(self.account)
            .call()
            .await
            .map_err(|err| ReadCallError::call("userInfo", err))?;
        Ok(info.amount)
    }

    async fn total_staked(&self) -> Result<U256, ReadCallError> {
        self.token_reader
            .balanceOf(self.contracts.pool)
            .call()
            .await
            .map_err(|err| ReadCallError::call("balanceOf", err))
    }

    async fn approve(&self, amount: U256) -> Result<TxOutcome, WriteCallError> {
        let pending = self
            .token_sender
            .approve(self.contracts.pool, amount)
            .from(self.account)
            .send()
            .await
            .map_err(|err| classify_send_error("approve", err))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| classify_send_error("approve", err))?;
        outcome("approve", &receipt)
    }

    async fn deposit(&self, amount: U256) -> Result<TxOutcome, WriteCallError> {
        let pending = self
            .pool_sender
            .deposit(amount)
            .from(self.account)
            .send()
            .await
            .map_err(|err| classify_send_error("deposit", err))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| classify_send_error("deposit", err))?;
        outcome("deposit", &receipt)
    }

    async fn withdraw(&self, amount: U256) -> Result<TxOutcome, WriteCallError> {
        let pending = self
            .pool_sender
            .withdraw(amount)
            .from(self.account)
            .send()
            .await
            .map_err(|err| classify_send_error("withdraw", err))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| classify_send_error("withdraw", err))?;
        outcome("withdraw", &receipt)
    }
}

fn outcome<R: ReceiptResponse>(
    method: &'static str,
    receipt: &R,
) -> Result<TxOutcome, WriteCallError> {
    let tx_hash = receipt.transaction_hash();
    if !receipt.status() {
        warn!(%tx_hash, "{method} reverted");
        return Err(WriteCallError::Reverted { method, tx_hash });
    }

    info!(%tx_hash, block = ?receipt.block_number(), "{method} mined");
    Ok(TxOutcome {
        tx_hash,
        block_number: receipt.block_number(),
        gas_used: receipt.gas_used(),
    })
}

/// EIP-1193 code 4001 and the usual wallet wording mean the user said no.
fn classify_send_error(method: &'static str, err: impl std::fmt::Display) -> WriteCallError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("4001")
        || lowered.contains("user rejected")
        || lowered.contains("user denied")
    {
        WriteCallError::Rejected { method, message }
    } else {
        WriteCallError::Transport { method, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::hex;
    use alloy::primitives::address;
    use alloy::providers::{Provider, ProviderBuilder};
    use alloy::sol_types::SolCall;
    use axum::{Json, Router, routing::post};
    use sd_types::ConnectStrategy;
    use serde_json::{Value, json};

    const ACCOUNT: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const POOL: Address = address!("0x1111111111111111111111111111111111111111");
    const TOKEN: Address = address!("0x2222222222222222222222222222222222222222");

    fn word(value: u128) -> String {
        format!("{value:064x}")
    }

    /// Answers `eth_call` for the five read selectors.
    async fn spawn_chain() -> String {
        let handler = |Json(request): Json<Value>| async move {
            let call = &request["params"][0];
            let input = call["input"]
                .as_str()
                .or_else(|| call["data"].as_str())
                .unwrap_or_default()
                .trim_start_matches("0x")
                .to_owned();
            let selector = input.get(..8).unwrap_or_default().to_owned();
            let pool_hex = hex::encode(POOL);

            let payload = if selector == hex::encode(IStakingToken::balanceOfCall::SELECTOR) {
                if input.ends_with(&pool_hex) {
                    word(5_000_000_000_000_000_000)
                } else {
                    word(1_000_000_000_000_000_000)
                }
            } else if selector == hex::encode(IStakingToken::allowanceCall::SELECTOR) {
                word(0)
            } else if selector == hex::encode(IMasterChef::pendingDD2Call::SELECTOR) {
                word(250_000_000_000_000_000)
            } else if selector == hex::encode(IMasterChef::userInfoCall::SELECTOR) {
                format!("{}{}", word(2_000_000_000_000_000_000), word(7))
            } else {
                String::new()
            };

            Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": format!("0x{payload}") }))
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/", post(handler)))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    fn session(url: &str) -> Session {
        let provider = ProviderBuilder::new().connect_http(url.parse().unwrap()).erased();
        Session {
            strategy: ConnectStrategy::Injected,
            account: ACCOUNT,
            chain_id: 5,
            reader: provider.clone(),
            sender: provider,
        }
    }

    fn contracts() -> ContractAddresses {
        ContractAddresses {
            pool: POOL,
            token: TOKEN,
        }
    }

    #[tokio::test]
    async fn reads_decode_contract_answers() -> anyhow::Result<()> {
        let url = spawn_chain().await;
        let gateway = EvmStakingGateway::bind(&session(&url), contracts());

        assert_eq!(gateway.token_balance().await?, U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(gateway.total_staked().await?, U256::from(5_000_000_000_000_000_000u128));
        assert_eq!(gateway.allowance().await?, U256::ZERO);
        assert_eq!(gateway.pending_reward().await?, U256::from(250_000_000_000_000_000u128));
        assert_eq!(gateway.staked_amount().await?, U256::from(2_000_000_000_000_000_000u128));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_node_is_a_read_error() {
        let gateway = EvmStakingGateway::bind(&session("http://127.0.0.1:9"), contracts());
        let err = gateway.token_balance().await.unwrap_err();
        assert!(err.to_string().starts_with("balanceOf call failed"));
    }

    #[tokio::test]
    async fn unreachable_node_is_a_write_transport_error() {
        let gateway = EvmStakingGateway::bind(&session("http://127.0.0.1:9"), contracts());
        let err = gateway.withdraw(U256::from(1u64)).await.unwrap_err();
        assert!(matches!(err, WriteCallError::Transport { method: "withdraw", .. }));
    }

    #[test]
    fn wallet_refusals_are_rejections() {
        let err = classify_send_error("deposit", "error code 4001: User rejected the request.");
        assert!(matches!(err, WriteCallError::Rejected { method: "deposit", .. }));
        let err = classify_send_error(
            "deposit",
            "MetaMask Tx Signature: User denied transaction signature.",
        );
        assert!(matches!(err, WriteCallError::Rejected { .. }));
        let err = classify_send_error("deposit", "insufficient funds for gas");
        assert!(matches!(err, WriteCallError::Transport { .. }));
    }
}
