pub mod artifacts;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod record;

pub use artifacts::{BuildInfo, ContractArtifacts, OPENZEPPELIN_IMPORTS};
pub use config::{
    DEFAULT_CONTRACT_NAME, LiquidityConfig, NetworkSelection, PathsConfig, TokenConfig,
    TokenkitConfig, VerifyConfig,
};
pub use error::{ArtifactError, ConfigError, Outcome, RecordError};
pub use history::{RecordSummary, latest_record_path, parse_record, read_latest_record};
pub use record::{DeploymentRecord, format_thousands, mint_share, write_record};
