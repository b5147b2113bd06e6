use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contracts::{HyperERC20, IUniswapV2Router02};
use crate::networks::NetworkConfig;

/// Gas ceiling for the add-liquidity call; pair creation is expensive and
/// estimation against a fresh token is unreliable.
pub const LIQUIDITY_GAS_LIMIT: u64 = 5_000_000;

/// Result of a successful contract creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResult {
    pub contract_address: Address,
    pub tx_hash: String,
    pub gas_used: Option<u64>,
}

/// A mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_hash: String,
    pub gas_used: u64,
}

/// Amounts for `addLiquidityETH`, all in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityParams {
    pub router: Address,
    pub token_desired: U256,
    pub token_min: U256,
    pub native_desired: U256,
    pub native_min: U256,
    pub recipient: Address,
    pub deadline: U256,
}

/// Chain operations the deploy procedure needs. Every transaction method
/// waits for one confirmation and fails if the receipt reports a revert.
#[async_trait]
pub trait TokenChain: Send + Sync {
    /// Address that signs every transaction.
    fn deployer(&self) -> Address;

    async fn chain_id(&self) -> Result<u64>;

    async fn native_balance(&self) -> Result<U256>;

    /// Submit a contract-creation transaction with `creation_code`.
    async fn deploy_contract(&self, creation_code: Bytes) -> Result<DeployResult>;

    /// Owner-authenticated `mint(to, amount)` on `token`.
    async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<TxResult>;

    /// Approve the router for the desired token amount, then add liquidity
    /// against the native currency.
    async fn add_liquidity(&self, token: Address, params: &LiquidityParams) -> Result<TxResult>;
}

/// [`TokenChain`] over a JSON-RPC endpoint with a local private-key signer.
pub struct EvmChain {
    provider: DynProvider,
    deployer: Address,
}

impl EvmChain {
    /// Build a signing provider for `network`.
    pub fn connect(network: &NetworkConfig, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("PRIVATE_KEY is not a valid secp256k1 private key")?;
        let signer = signer.with_chain_id(Some(network.chain_id));
        let deployer = signer.address();

        let url: url::Url = network
            .rpc_url
            .parse()
            .with_context(|| format!("invalid RPC URL: {}", network.rpc_url))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        debug!(network = %network.name, deployer = %deployer, "EVM provider connected");
        Ok(Self { provider, deployer })
    }
}

fn ensure_success(receipt: &TransactionReceipt, what: &str) -> Result<TxResult> {
    let tx_hash = receipt.transaction_hash.to_string();
    if !receipt.status() {
        anyhow::bail!("{what} transaction {tx_hash} reverted");
    }
    Ok(TxResult {
        tx_hash,
        gas_used: receipt.gas_used as u64,
    })
}

#[async_trait]
impl TokenChain for EvmChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("eth_chainId request failed")
    }

    async fn native_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.deployer)
            .await
            .context("eth_getBalance request failed")
    }

    async fn deploy_contract(&self, creation_code: Bytes) -> Result<DeployResult> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(creation_code);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit contract-creation transaction")?;
        info!(tx = %pending.tx_hash(), "contract-creation transaction submitted");

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .context("contract-creation transaction was not mined")?;
        let mined = ensure_success(&receipt, "contract-creation")?;
        let contract_address = receipt
            .contract_address
            .context("contract-creation receipt carries no contract address")?;

        Ok(DeployResult {
            contract_address,
            tx_hash: mined.tx_hash,
            gas_used: Some(mined.gas_used),
        })
    }

    async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<TxResult> {
        let contract = HyperERC20::new(token, self.provider.clone());
        let receipt = contract
            .mint(to, amount)
            .send()
            .await
            .context("failed to submit mint transaction")?
            .get_receipt()
            .await
            .context("mint transaction was not mined")?;
        ensure_success(&receipt, "mint")
    }

    async fn add_liquidity(&self, token: Address, params: &LiquidityParams) -> Result<TxResult> {
        let router = IUniswapV2Router02::new(params.router, self.provider.clone());
        let wrapped_native = router
            .WETH()
            .call()
            .await
            .context("router WETH() lookup failed; is ROUTER_ADDRESS a V2 router?")?;
        debug!(?wrapped_native, router = %params.router, "router wrapped-native token");

        let contract = HyperERC20::new(token, self.provider.clone());
        let approval = contract
            .approve(params.router, params.token_desired)
            .send()
            .await
            .context("failed to submit router approval")?
            .get_receipt()
            .await
            .context("router approval was not mined")?;
        ensure_success(&approval, "approve")?;
        info!(router = %params.router, amount = %params.token_desired, "router approved");

        let receipt = router
            .addLiquidityETH(
                token,
                params.token_desired,
                params.token_min,
                params.native_min,
                params.recipient,
                params.deadline,
            )
            .value(params.native_desired)
            .gas(LIQUIDITY_GAS_LIMIT)
            .send()
            .await
            .context("failed to submit addLiquidityETH")?
            .get_receipt()
            .await
            .context("addLiquidityETH was not mined")?;
        ensure_success(&receipt, "addLiquidityETH")
    }
}
