use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokenkit_core::TokenkitConfig;

#[derive(Parser, Debug)]
#[command(version, about = "Deploy, seed and verify HyperERC20 tokens", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Dotenv file to load instead of `./.env`
    #[arg(long, global = true, env = "TOKENKIT_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Deploy the token, mint, optionally add liquidity and record the deployment
    Deploy,
    /// Verify through the explorer's `verifysourcecode` API
    Verify(VerifyArgs),
    /// Verify by uploading source and metadata to Sourcify
    VerifySourcify(VerifyArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyArgs {
    /// Contract to verify; defaults to CONTRACT_ADDRESS, then the latest deployment record
    #[arg(long)]
    pub address: Option<String>,
    /// Contract name under `contracts/`; defaults to CONTRACT_NAME
    #[arg(long)]
    pub contract_name: Option<String>,
}

impl VerifyArgs {
    /// Command-line flags take precedence over the environment.
    pub fn apply(&self, config: &mut TokenkitConfig) {
        if let Some(address) = &self.address {
            config.verify.contract_address = Some(address.trim().to_string());
        }
        if let Some(name) = &self.contract_name {
            config.verify.contract_name = name.trim().to_string();
        }
    }
}
