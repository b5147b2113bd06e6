use std::time::Duration;

use anyhow::Result;
use tokenkit_chain::{DeployReport, EvmChain, NetworkConfig, deploy_token, resolve_network};
use tokenkit_core::{ConfigError, Outcome, TokenkitConfig, format_thousands};
use tokenkit_verify::{
    EtherscanClient, ExplorerApi, SourcifyClient, VerifyTarget, resolve_target, verify_native,
    verify_via_sourcify,
};
use tracing::{info, warn};

/// `tokenkit deploy`
pub async fn deploy(config: &TokenkitConfig) -> Result<()> {
    let network = resolve_network(&config.network)?;
    let private_key = config
        .network
        .private_key
        .as_deref()
        .ok_or(ConfigError::Missing("PRIVATE_KEY"))?;
    let chain = EvmChain::connect(&network, private_key)?;
    let explorer = EtherscanClient::from_config(config)?;

    let report = deploy_token(config, &network, &chain).await?;
    log_report(&network, &report);

    let verification = verify_after_deploy(config, &network, &report, &explorer).await;
    if verification.is_degraded() {
        warn!("run `tokenkit verify` once the explorer has indexed the contract");
    }
    info!(verification = %verification, "deployment complete");
    Ok(())
}

/// Verification of a fresh deployment. Local nodes have nothing to verify
/// against; everywhere else the explorer needs a moment to index the code.
async fn verify_after_deploy<E>(
    config: &TokenkitConfig,
    network: &NetworkConfig,
    report: &DeployReport,
    api: &E,
) -> Outcome
where
    E: ExplorerApi + ?Sized,
{
    if network.is_local {
        return Outcome::Skipped(format!("{} is a local network", network.name));
    }

    info!(
        seconds = config.verify.delay_secs,
        "waiting for the explorer to index the deployment"
    );
    tokio::time::sleep(Duration::from_secs(config.verify.delay_secs)).await;

    let record = &report.record;
    let target = VerifyTarget {
        address: report.contract_address,
        contract_name: record.contract_name.clone(),
        token_name: record.token_name.clone(),
        token_symbol: record.token_symbol.clone(),
        decimals: record.decimals,
        chain_id: Some(record.chain_id),
    };
    verify_native(config, &target, record.chain_id, api).await
}

fn log_report(network: &NetworkConfig, report: &DeployReport) {
    let record = &report.record;
    info!(
        name = %record.token_name,
        symbol = %record.token_symbol,
        address = %report.contract_address,
        tx = %record.transaction_hash,
        network = %record.network_name,
        chain_id = record.chain_id,
        "token deployed"
    );
    if let Some(url) = network.address_url(&report.contract_address) {
        info!(url = %url, "view on explorer");
    }
    info!(
        total_supply = %format_thousands(record.total_supply),
        minted = %format_thousands(record.minted_tokens()),
        mint = %report.mint,
        liquidity = %report.liquidity,
        "post-deployment steps"
    );
    info!(path = %report.record_path.display(), "deployment record saved");
}

/// `tokenkit verify`
pub async fn verify(config: &TokenkitConfig) -> Result<()> {
    let target = resolve_target(config)?;
    let chain_id = target.chain_id(config)?;
    let client = EtherscanClient::from_config(config)?;

    let outcome = verify_native(config, &target, chain_id, &client).await;
    info!(outcome = %outcome, "native verification finished");
    Ok(())
}

/// `tokenkit verify-sourcify`
pub async fn verify_sourcify(config: &TokenkitConfig) -> Result<()> {
    let target = resolve_target(config)?;
    let chain_id = target.chain_id(config)?;
    let client = SourcifyClient::from_config(config)?;

    let outcome = verify_via_sourcify(config, &target, chain_id, &client).await;
    info!(outcome = %outcome, "Sourcify verification finished");
    Ok(())
}
