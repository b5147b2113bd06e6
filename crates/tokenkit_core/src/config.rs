use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Fixed contract identity used by the deploy flow and the record writer.
pub const DEFAULT_CONTRACT_NAME: &str = "HyperERC20";

const DEFAULT_SOURCIFY_URL: &str = "https://sourcify.parsec.finance/verify";
const DEFAULT_EXPLORER_API_KEY: &str = "no-api-key-needed";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Constructor arguments and supply parameters for the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens, not scaled by `decimals`.
    pub total_supply: u128,
    pub mint_percentage: u8,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "MyToken".into(),
            symbol: "MTK".into(),
            decimals: 18,
            total_supply: 1_000_000,
            mint_percentage: 100,
        }
    }
}

/// Liquidity seeding against an external AMM router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    pub enabled: bool,
    pub router_address: Option<String>,
    /// Whole tokens, not scaled by `decimals`.
    pub token_amount: u128,
    /// Native currency amount as a decimal string (e.g. `"0.5"`).
    pub native_amount: String,
    pub slippage_percent: u8,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            router_address: None,
            token_amount: 100_000,
            native_amount: "1".into(),
            slippage_percent: 5,
        }
    }
}

/// Network selection. Resolution into an RPC endpoint happens in the chain crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSelection {
    pub name: String,
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl Default for NetworkSelection {
    fn default() -> Self {
        Self {
            name: "localhost".into(),
            rpc_url: None,
            chain_id: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for NetworkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSelection")
            .field("name", &self.name)
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings shared by both verification procedures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// When set, verification targets this address instead of the latest record.
    pub contract_address: Option<String>,
    pub contract_name: String,
    pub sourcify_url: String,
    pub explorer_api_url: String,
    pub explorer_api_key: String,
    pub delay_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            contract_name: DEFAULT_CONTRACT_NAME.into(),
            sourcify_url: DEFAULT_SOURCIFY_URL.into(),
            explorer_api_url: DEFAULT_SOURCIFY_URL.into(),
            explorer_api_key: DEFAULT_EXPLORER_API_KEY.into(),
            delay_secs: 10,
        }
    }
}

/// Filesystem layout the procedures read from and write to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root containing `contracts/`, `artifacts/` and `node_modules/`.
    pub project_root: PathBuf,
    pub history_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            history_dir: PathBuf::from("deployments").join("history"),
            log_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TokenkitConfig
// ---------------------------------------------------------------------------

/// Configuration for every procedure, resolved once at startup.
///
/// Every value comes from a flat environment mapping and falls back to a
/// default when unset or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenkitConfig {
    pub token: TokenConfig,
    pub liquidity: LiquidityConfig,
    pub network: NetworkSelection,
    pub verify: VerifyConfig,
    pub paths: PathsConfig,
}

impl TokenkitConfig {
    /// Load `.env` from the working directory (if present) and read the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_file(None)
    }

    /// Same as [`from_env`](Self::from_env) but with an explicit dotenv file.
    pub fn from_env_file(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
            None => {
                // A missing `.env` is the normal case.
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an in-memory map, mostly for tests.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Resolve every setting through `lookup`. Values are trimmed and blank
    /// values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let token = TokenConfig {
            name: single_line("TOKEN_NAME", get("TOKEN_NAME"), defaults.token.name)?,
            symbol: single_line("TOKEN_SYMBOL", get("TOKEN_SYMBOL"), defaults.token.symbol)?,
            decimals: parse_or("TOKEN_DECIMALS", get("TOKEN_DECIMALS"), defaults.token.decimals)?,
            total_supply: parse_or(
                "TOTAL_SUPPLY",
                get("TOTAL_SUPPLY").or_else(|| get("INITIAL_SUPPLY")),
                defaults.token.total_supply,
            )?,
            mint_percentage: percentage(
                "MINT_PERCENTAGE",
                get("MINT_PERCENTAGE"),
                defaults.token.mint_percentage,
            )?,
        };

        let liquidity = LiquidityConfig {
            enabled: flag("ADD_LIQUIDITY", get("ADD_LIQUIDITY"), defaults.liquidity.enabled)?,
            router_address: get("ROUTER_ADDRESS"),
            token_amount: parse_or(
                "LIQUIDITY_TOKEN_AMOUNT",
                get("LIQUIDITY_TOKEN_AMOUNT"),
                defaults.liquidity.token_amount,
            )?,
            native_amount: get("LIQUIDITY_ETH_AMOUNT").unwrap_or(defaults.liquidity.native_amount),
            slippage_percent: percentage(
                "LIQUIDITY_SLIPPAGE",
                get("LIQUIDITY_SLIPPAGE"),
                defaults.liquidity.slippage_percent,
            )?,
        };

        let network = NetworkSelection {
            name: get("NETWORK").unwrap_or(defaults.network.name),
            rpc_url: get("RPC_URL"),
            chain_id: get("CHAIN_ID")
                .map(|v| parse_value("CHAIN_ID", &v))
                .transpose()?,
            private_key: get("PRIVATE_KEY"),
        };

        let verify = VerifyConfig {
            contract_address: get("CONTRACT_ADDRESS"),
            contract_name: get("CONTRACT_NAME").unwrap_or(defaults.verify.contract_name),
            sourcify_url: get("SOURCIFY_URL").unwrap_or(defaults.verify.sourcify_url),
            explorer_api_url: get("EXPLORER_API_URL").unwrap_or(defaults.verify.explorer_api_url),
            explorer_api_key: get("EXPLORER_API_KEY").unwrap_or(defaults.verify.explorer_api_key),
            delay_secs: parse_or(
                "VERIFY_DELAY_SECS",
                get("VERIFY_DELAY_SECS"),
                defaults.verify.delay_secs,
            )?,
        };

        let project_root = get("PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.paths.project_root);
        let paths = PathsConfig {
            history_dir: get("DEPLOYMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.history_dir),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            project_root,
        };

        let config = Self {
            token,
            liquidity,
            network,
            verify,
            paths,
        };
        debug!(?config, "configuration resolved");
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Value parsing helpers
// ---------------------------------------------------------------------------

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn percentage(key: &'static str, raw: Option<String>, default: u8) -> Result<u8, ConfigError> {
    let value: u8 = parse_or(key, raw, default)?;
    if value > 100 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be between 0 and 100".into(),
        });
    }
    Ok(value)
}

fn flag(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(v) = raw else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: v,
            reason: "expected true/false".into(),
        }),
    }
}

/// Record labels are line-anchored, so names must stay on one line.
fn single_line(
    key: &'static str,
    raw: Option<String>,
    default: String,
) -> Result<String, ConfigError> {
    let value = raw.unwrap_or(default);
    if value.chars().any(char::is_control) {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "control characters are not allowed".into(),
        });
    }
    Ok(value)
}
