use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use chrono::Utc;
use tokenkit_core::{
    ContractArtifacts, DEFAULT_CONTRACT_NAME, DeploymentRecord, Outcome, TokenkitConfig,
    format_thousands, mint_share, write_record,
};
use tracing::{error, info, warn};

use crate::amounts::{min_with_slippage, mint_amount, parse_native_amount, scale_units};
use crate::contracts::{ConstructorArgs, creation_code};
use crate::evm::{LiquidityParams, TokenChain};
use crate::networks::NetworkConfig;

/// Seconds until an add-liquidity call expires.
pub const LIQUIDITY_DEADLINE_SECS: i64 = 20 * 60;

/// What a deploy run produced. Verification is appended by the caller since
/// it runs after the record is on disk.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub contract_address: Address,
    pub record: DeploymentRecord,
    pub record_path: PathBuf,
    pub mint: Outcome,
    pub liquidity: Outcome,
}

/// Deploy the token, mint, seed liquidity, and write the deployment record.
///
/// Only the contract creation is fatal. Mint and liquidity failures are
/// captured as [`Outcome::Degraded`] and the record is still written.
pub async fn deploy_token<C>(
    config: &TokenkitConfig,
    network: &NetworkConfig,
    chain: &C,
) -> Result<DeployReport>
where
    C: TokenChain + ?Sized,
{
    let token = &config.token;
    let deployer = chain.deployer();

    info!(
        name = %token.name,
        symbol = %token.symbol,
        decimals = token.decimals,
        total_supply = %format_thousands(token.total_supply),
        mint_percentage = token.mint_percentage,
        deployer = %deployer,
        network = %network.name,
        "deploying token"
    );
    preflight(network, chain).await;

    let artifacts = ContractArtifacts::new(&config.paths.project_root, DEFAULT_CONTRACT_NAME);
    let bytecode = artifacts
        .creation_bytecode()
        .context("cannot load contract bytecode; compile the contracts first")?;
    let args = ConstructorArgs::new(&token.name, &token.symbol, token.decimals);
    let code = creation_code(&bytecode, &args)?;

    let deployed = chain
        .deploy_contract(code)
        .await
        .context("token deployment failed")?;
    info!(
        address = %deployed.contract_address,
        tx = %deployed.tx_hash,
        gas_used = ?deployed.gas_used,
        "token deployed"
    );

    let mint = mint_initial_supply(config, chain, deployed.contract_address).await;
    let liquidity = seed_liquidity(config, chain, deployed.contract_address).await;

    let record = DeploymentRecord {
        token_name: token.name.clone(),
        token_symbol: token.symbol.clone(),
        decimals: token.decimals,
        total_supply: token.total_supply,
        mint_percentage: token.mint_percentage,
        contract_address: deployed.contract_address.to_string(),
        transaction_hash: deployed.tx_hash.clone(),
        deployer_address: deployer.to_string(),
        network_name: network.name.clone(),
        chain_id: network.chain_id,
        timestamp_utc: Utc::now(),
        gas_used: deployed.gas_used,
        contract_name: DEFAULT_CONTRACT_NAME.to_string(),
        mint: mint.clone(),
        liquidity: liquidity.clone(),
    };
    let record_path = write_record(&config.paths.history_dir, &record)
        .context("token deployed but the deployment record could not be written")?;

    Ok(DeployReport {
        contract_address: deployed.contract_address,
        record,
        record_path,
        mint,
        liquidity,
    })
}

/// Informational checks before spending gas. Nothing here aborts the run.
async fn preflight<C: TokenChain + ?Sized>(network: &NetworkConfig, chain: &C) {
    match chain.chain_id().await {
        Ok(id) if id != network.chain_id => warn!(
            expected = network.chain_id,
            actual = id,
            "RPC endpoint reports a different chain ID than configured"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %format!("{e:#}"), "could not query chain ID"),
    }

    match chain.native_balance().await {
        Ok(balance) if balance.is_zero() => {
            warn!(deployer = %chain.deployer(), "deployer has no native balance for gas")
        }
        Ok(balance) => info!(balance = %balance, "deployer balance (wei)"),
        Err(e) => warn!(error = %format!("{e:#}"), "could not query deployer balance"),
    }
}

async fn mint_initial_supply<C: TokenChain + ?Sized>(
    config: &TokenkitConfig,
    chain: &C,
    token_address: Address,
) -> Outcome {
    let token = &config.token;
    if token.mint_percentage == 0 {
        return Outcome::Skipped("mint percentage is 0".into());
    }

    let amount = match mint_amount(token.total_supply, token.mint_percentage, token.decimals) {
        Ok(amount) => amount,
        Err(e) => return Outcome::degraded(&e),
    };
    let whole = mint_share(token.total_supply, token.mint_percentage);
    info!(
        percentage = token.mint_percentage,
        tokens = %format_thousands(whole),
        base_units = %amount,
        "minting initial supply"
    );

    match chain.mint(token_address, chain.deployer(), amount).await {
        Ok(tx) => {
            info!(tx = %tx.tx_hash, "initial supply minted");
            Outcome::Ok
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "mint failed; the deployment is kept and recorded");
            Outcome::degraded(&e)
        }
    }
}

async fn seed_liquidity<C: TokenChain + ?Sized>(
    config: &TokenkitConfig,
    chain: &C,
    token_address: Address,
) -> Outcome {
    if !config.liquidity.enabled {
        return Outcome::Skipped("ADD_LIQUIDITY is not enabled".into());
    }

    match try_seed_liquidity(config, chain, token_address).await {
        Ok(()) => Outcome::Ok,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "adding liquidity failed; continuing without it");
            Outcome::degraded(&e)
        }
    }
}

async fn try_seed_liquidity<C: TokenChain + ?Sized>(
    config: &TokenkitConfig,
    chain: &C,
    token_address: Address,
) -> Result<()> {
    let params = liquidity_params(config, chain.deployer(), Utc::now().timestamp())?;
    info!(
        router = %params.router,
        token_desired = %params.token_desired,
        token_min = %params.token_min,
        native_desired = %params.native_desired,
        native_min = %params.native_min,
        "adding liquidity"
    );
    let tx = chain.add_liquidity(token_address, &params).await?;
    info!(tx = %tx.tx_hash, "liquidity added");
    Ok(())
}

/// Router call amounts for the configured liquidity, with the deadline
/// [`LIQUIDITY_DEADLINE_SECS`] after `now_unix`.
pub fn liquidity_params(
    config: &TokenkitConfig,
    recipient: Address,
    now_unix: i64,
) -> Result<LiquidityParams> {
    let liquidity = &config.liquidity;
    let router: Address = liquidity
        .router_address
        .as_deref()
        .context("ROUTER_ADDRESS is not set")?
        .parse()
        .context("ROUTER_ADDRESS is not a valid address")?;

    let token_desired = scale_units(liquidity.token_amount, config.token.decimals)?;
    let native_desired = parse_native_amount(&liquidity.native_amount)?;
    let deadline = u64::try_from(now_unix + LIQUIDITY_DEADLINE_SECS)
        .context("system clock is before the unix epoch")?;

    Ok(LiquidityParams {
        router,
        token_min: min_with_slippage(token_desired, liquidity.slippage_percent),
        native_min: min_with_slippage(native_desired, liquidity.slippage_percent),
        token_desired,
        native_desired,
        recipient,
        deadline: U256::from(deadline),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use alloy::primitives::{Bytes, address};
    use async_trait::async_trait;

    use super::*;
    use crate::evm::{DeployResult, TxResult};

    const TOKEN: Address = address!("0x9af33524cF693c622311E6A675f29942af647166");
    const DEPLOYER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Deploy(Bytes),
        Mint { to: Address, amount: U256 },
        AddLiquidity(LiquidityParams),
    }

    #[derive(Default)]
    struct FakeChain {
        calls: Mutex<Vec<Call>>,
        fail_deploy: bool,
        fail_mint: bool,
        fail_liquidity: bool,
    }

    impl FakeChain {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenChain for FakeChain {
        fn deployer(&self) -> Address {
            DEPLOYER
        }

        async fn chain_id(&self) -> Result<u64> {
            Ok(31337)
        }

        async fn native_balance(&self) -> Result<U256> {
            Ok(U256::from(10u8).pow(U256::from(18u8)))
        }

        async fn deploy_contract(&self, creation_code: Bytes) -> Result<DeployResult> {
            self.calls.lock().unwrap().push(Call::Deploy(creation_code));
            if self.fail_deploy {
                anyhow::bail!("execution reverted");
            }
            Ok(DeployResult {
                contract_address: TOKEN,
                tx_hash: "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060".into(),
                gas_used: Some(1_234_567),
            })
        }

        async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<TxResult> {
            assert_eq!(token, TOKEN);
            self.calls.lock().unwrap().push(Call::Mint { to, amount });
            if self.fail_mint {
                anyhow::bail!("OwnableUnauthorizedAccount");
            }
            Ok(TxResult {
                tx_hash: "0xmint".into(),
                gas_used: 50_000,
            })
        }

        async fn add_liquidity(&self, _token: Address, params: &LiquidityParams) -> Result<TxResult> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::AddLiquidity(params.clone()));
            if self.fail_liquidity {
                anyhow::bail!("UniswapV2Router: INSUFFICIENT_A_AMOUNT");
            }
            Ok(TxResult {
                tx_hash: "0xliquidity".into(),
                gas_used: 3_000_000,
            })
        }
    }

    fn write_artifact(root: &Path) {
        let dir = root
            .join("artifacts")
            .join("contracts")
            .join("HyperERC20.sol");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("HyperERC20.json"),
            r#"{"contractName":"HyperERC20","bytecode":"0x6080604052","abi":[]}"#,
        )
        .unwrap();
    }

    fn config(root: &Path, pairs: &[(&str, &str)]) -> TokenkitConfig {
        let mut vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("PROJECT_ROOT".into(), root.display().to_string());
        vars.insert(
            "DEPLOYMENTS_DIR".into(),
            root.join("deployments").join("history").display().to_string(),
        );
        TokenkitConfig::from_map(&vars).unwrap()
    }

    fn local() -> NetworkConfig {
        crate::networks::known_networks()
            .into_iter()
            .find(|n| n.name == "localhost")
            .unwrap()
    }

    #[tokio::test]
    async fn scenario_mints_half_and_records_it() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(
            tmp.path(),
            &[
                ("TOKEN_NAME", "Test"),
                ("TOKEN_SYMBOL", "TST"),
                ("TOTAL_SUPPLY", "1000000"),
                ("MINT_PERCENTAGE", "50"),
            ],
        );
        let chain = FakeChain::default();

        let report = deploy_token(&config, &local(), &chain).await.unwrap();

        let calls = chain.calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            Call::Deploy(code) => {
                let expected = creation_code("0x6080604052", &ConstructorArgs::new("Test", "TST", 18))
                    .unwrap();
                assert_eq!(code, &expected);
            }
            other => panic!("expected deploy, got {other:?}"),
        }
        assert_eq!(
            calls[1],
            Call::Mint {
                to: DEPLOYER,
                amount: U256::from(500_000u32) * U256::from(10u8).pow(U256::from(18u8)),
            }
        );

        assert_eq!(report.contract_address, TOKEN);
        assert_eq!(report.mint, Outcome::Ok);
        assert!(matches!(report.liquidity, Outcome::Skipped(_)));

        let text = std::fs::read_to_string(&report.record_path).unwrap();
        assert!(text.contains("**Token Symbol:** TST"));
        assert!(text.contains("**Initial Mint:** 50% (500,000 TST)"));
        assert!(text.contains(&format!("**Contract Address:** {TOKEN}")));
        assert!(text.contains("**Contract Name:** HyperERC20"));
    }

    #[tokio::test]
    async fn zero_percent_submits_no_mint() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(tmp.path(), &[("MINT_PERCENTAGE", "0")]);
        let chain = FakeChain::default();

        let report = deploy_token(&config, &local(), &chain).await.unwrap();

        assert!(
            !chain
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Mint { .. }))
        );
        assert!(matches!(report.mint, Outcome::Skipped(_)));
        let text = std::fs::read_to_string(&report.record_path).unwrap();
        assert!(text.contains("**Initial Mint:** 0% (0 MTK)"));
    }

    #[tokio::test]
    async fn deploy_failure_is_fatal_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(tmp.path(), &[]);
        let chain = FakeChain {
            fail_deploy: true,
            ..Default::default()
        };

        let err = deploy_token(&config, &local(), &chain).await.unwrap_err();
        assert!(format!("{err:#}").contains("execution reverted"));
        assert_eq!(chain.calls().len(), 1);
        assert!(!config.paths.history_dir.exists());
    }

    #[tokio::test]
    async fn missing_artifact_is_fatal_before_any_transaction() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), &[]);
        let chain = FakeChain::default();

        let err = deploy_token(&config, &local(), &chain).await.unwrap_err();
        assert!(format!("{err:#}").contains("compile the contracts"));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn mint_failure_still_writes_record() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(tmp.path(), &[("MINT_PERCENTAGE", "25")]);
        let chain = FakeChain {
            fail_mint: true,
            ..Default::default()
        };

        let report = deploy_token(&config, &local(), &chain).await.unwrap();
        assert!(report.mint.is_degraded());
        let text = std::fs::read_to_string(&report.record_path).unwrap();
        assert!(text.contains("**Mint:** failed"));
        assert!(text.contains("OwnableUnauthorizedAccount"));
    }

    #[tokio::test]
    async fn liquidity_uses_slippage_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(
            tmp.path(),
            &[
                ("ADD_LIQUIDITY", "true"),
                ("ROUTER_ADDRESS", ROUTER),
                ("LIQUIDITY_TOKEN_AMOUNT", "1000"),
                ("LIQUIDITY_ETH_AMOUNT", "2"),
                ("LIQUIDITY_SLIPPAGE", "5"),
                ("TOKEN_DECIMALS", "6"),
            ],
        );
        let chain = FakeChain::default();

        let report = deploy_token(&config, &local(), &chain).await.unwrap();
        assert_eq!(report.liquidity, Outcome::Ok);

        let params = chain
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::AddLiquidity(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(params.router, ROUTER.parse::<Address>().unwrap());
        assert_eq!(params.token_desired, U256::from(1_000_000_000u64));
        assert_eq!(params.token_min, U256::from(950_000_000u64));
        assert_eq!(params.native_desired, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(params.native_min, U256::from(1_900_000_000_000_000_000u128));
        assert_eq!(params.recipient, DEPLOYER);
    }

    #[tokio::test]
    async fn liquidity_failure_is_degraded() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(
            tmp.path(),
            &[("ADD_LIQUIDITY", "1"), ("ROUTER_ADDRESS", ROUTER)],
        );
        let chain = FakeChain {
            fail_liquidity: true,
            ..Default::default()
        };

        let report = deploy_token(&config, &local(), &chain).await.unwrap();
        assert!(report.liquidity.is_degraded());
        assert_eq!(report.mint, Outcome::Ok);
        assert!(report.record_path.exists());
    }

    #[tokio::test]
    async fn liquidity_without_router_is_degraded_without_calls() {
        let tmp = tempfile::tempdir().unwrap();
        write_artifact(tmp.path());
        let config = config(tmp.path(), &[("ADD_LIQUIDITY", "true")]);
        let chain = FakeChain::default();

        let report = deploy_token(&config, &local(), &chain).await.unwrap();
        match &report.liquidity {
            Outcome::Degraded(reason) => assert!(reason.contains("ROUTER_ADDRESS")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(
            !chain
                .calls()
                .iter()
                .any(|c| matches!(c, Call::AddLiquidity(_)))
        );
    }

    #[test]
    fn liquidity_deadline_is_twenty_minutes_out() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), &[("ROUTER_ADDRESS", ROUTER)]);
        let params = liquidity_params(&config, DEPLOYER, 1_700_000_000).unwrap();
        assert_eq!(params.deadline, U256::from(1_700_000_000u64 + 1_200));
    }

    #[test]
    fn liquidity_params_reject_bad_router() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), &[("ROUTER_ADDRESS", "router.eth")]);
        let err = liquidity_params(&config, DEPLOYER, 0).unwrap_err();
        assert!(format!("{err:#}").contains("ROUTER_ADDRESS"));
    }
}
