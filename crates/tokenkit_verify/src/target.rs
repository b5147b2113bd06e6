use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokenkit_chain::{ConstructorArgs, resolve_network};
use tokenkit_core::{TokenkitConfig, read_latest_record};
use tracing::info;

/// The deployed contract a verification run is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyTarget {
    pub address: Address,
    pub contract_name: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    /// Known when the target came from a deployment record.
    pub chain_id: Option<u64>,
}

impl VerifyTarget {
    pub fn constructor_args(&self) -> ConstructorArgs {
        ConstructorArgs::new(&self.token_name, &self.token_symbol, self.decimals)
    }

    /// Chain to verify on: the recorded deployment chain, else the configured
    /// network (`NETWORK` / `CHAIN_ID`).
    pub fn chain_id(&self, config: &TokenkitConfig) -> Result<u64> {
        match self.chain_id {
            Some(id) => Ok(id),
            None => Ok(resolve_network(&config.network)?.chain_id),
        }
    }
}

/// Decide what to verify.
///
/// `CONTRACT_ADDRESS` wins and takes the constructor arguments from the token
/// settings. Otherwise the latest deployment record supplies both.
pub fn resolve_target(config: &TokenkitConfig) -> Result<VerifyTarget> {
    let contract_name = config.verify.contract_name.clone();

    if let Some(address) = &config.verify.contract_address {
        let address = parse_address(address)?;
        info!(address = %address, "verifying configured contract address");
        return Ok(VerifyTarget {
            address,
            contract_name,
            token_name: config.token.name.clone(),
            token_symbol: config.token.symbol.clone(),
            decimals: config.token.decimals,
            chain_id: None,
        });
    }

    let summary = read_latest_record(&config.paths.history_dir)
        .context("no CONTRACT_ADDRESS set and no usable deployment record")?;
    let address = parse_address(&summary.contract_address)
        .with_context(|| format!("in deployment record {}", summary.path.display()))?;
    info!(
        address = %address,
        record = %summary.path.display(),
        chain_id = ?summary.chain_id,
        "verifying contract from latest deployment record"
    );

    Ok(VerifyTarget {
        address,
        contract_name,
        token_name: summary.token_name,
        token_symbol: summary.token_symbol,
        decimals: summary.decimals,
        chain_id: summary.chain_id,
    })
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .with_context(|| format!("'{raw}' is not a valid contract address"))
}

/// Human-facing page for a verified contract, derived from the Sourcify API base.
///
/// `https://sourcify.parsec.finance/verify` becomes
/// `https://sourcify.parsec.finance/#/lookup/<address>`.
pub fn lookup_url(sourcify_url: &str, address: &Address) -> String {
    let base = sourcify_url.trim_end_matches('/');
    let base = base.strip_suffix("/verify").unwrap_or(base);
    format!("{base}/#/lookup/{address}")
}
