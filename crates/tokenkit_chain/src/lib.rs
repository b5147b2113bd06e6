pub mod amounts;
pub mod contracts;
pub mod deploy;
pub mod evm;
pub mod networks;

pub use amounts::{min_with_slippage, mint_amount, parse_native_amount, scale_units};
pub use contracts::{ConstructorArgs, creation_code};
pub use deploy::{DeployReport, LIQUIDITY_DEADLINE_SECS, deploy_token, liquidity_params};
pub use evm::{DeployResult, EvmChain, LiquidityParams, TokenChain, TxResult};
pub use networks::{NetworkConfig, known_networks, resolve_network, validate_url};
