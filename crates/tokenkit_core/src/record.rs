use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Outcome, RecordError};

// Labels the reader anchors on. Changing any of these breaks existing records.
pub const LABEL_TOKEN_NAME: &str = "Token Name";
pub const LABEL_TOKEN_SYMBOL: &str = "Token Symbol";
pub const LABEL_DECIMALS: &str = "Decimals";
pub const LABEL_CONTRACT_ADDRESS: &str = "Contract Address";
pub const LABEL_NETWORK: &str = "Network";

/// Heading of the section carrying the JSON projection of the record.
pub const MACHINE_READABLE_HEADING: &str = "## Machine-Readable Record";

const MAX_NAME_SUFFIX: u32 = 1000;

/// Facts about one completed deployment, written once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub total_supply: u128,
    pub mint_percentage: u8,
    pub contract_address: String,
    pub transaction_hash: String,
    pub deployer_address: String,
    pub network_name: String,
    pub chain_id: u64,
    pub timestamp_utc: DateTime<Utc>,
    pub gas_used: Option<u64>,
    pub contract_name: String,
    pub mint: Outcome,
    pub liquidity: Outcome,
}

impl DeploymentRecord {
    /// Whole tokens minted at deploy time: `floor(total_supply * pct / 100)`.
    pub fn minted_tokens(&self) -> u128 {
        mint_share(self.total_supply, self.mint_percentage)
    }

    /// File name: `<timestamp>_<symbol>_<address prefix>.md`.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            self.timestamp_utc.format("%Y-%m-%d_%H-%M-%S"),
            sanitize_symbol(&self.token_symbol),
            address_prefix(&self.contract_address),
        )
    }

    /// Render the record as markdown.
    pub fn to_markdown(&self) -> Result<String, RecordError> {
        let json = serde_json::to_string(self).map_err(RecordError::Serialize)?;
        let symbol = &self.token_symbol;
        let gas = self
            .gas_used
            .map(|g| format_thousands(g as u128))
            .unwrap_or_else(|| "N/A".into());

        let mut md = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(md, "# {} ({}) Deployment", self.token_name, symbol);
        let _ = writeln!(md);
        let _ = writeln!(md, "## Token Details");
        let _ = writeln!(md);
        let _ = writeln!(md, "- **{LABEL_TOKEN_NAME}:** {}", self.token_name);
        let _ = writeln!(md, "- **{LABEL_TOKEN_SYMBOL}:** {}", symbol);
        let _ = writeln!(md, "- **{LABEL_DECIMALS}:** {}", self.decimals);
        let _ = writeln!(
            md,
            "- **Total Supply:** {} {}",
            format_thousands(self.total_supply),
            symbol
        );
        let _ = writeln!(
            md,
            "- **Initial Mint:** {}% ({} {})",
            self.mint_percentage,
            format_thousands(self.minted_tokens()),
            symbol
        );
        let _ = writeln!(md);
        let _ = writeln!(md, "## Deployment Details");
        let _ = writeln!(md);
        let _ = writeln!(md, "- **Contract Name:** {}", self.contract_name);
        let _ = writeln!(md, "- **{LABEL_CONTRACT_ADDRESS}:** {}", self.contract_address);
        let _ = writeln!(md, "- **Transaction Hash:** {}", self.transaction_hash);
        let _ = writeln!(md, "- **Deployer Address:** {}", self.deployer_address);
        let _ = writeln!(
            md,
            "- **{LABEL_NETWORK}:** {} (chain ID {})",
            self.network_name, self.chain_id
        );
        let _ = writeln!(
            md,
            "- **Timestamp (UTC):** {}",
            self.timestamp_utc.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(md, "- **Gas Used:** {gas}");
        let _ = writeln!(md);
        let _ = writeln!(md, "## Post-Deployment Steps");
        let _ = writeln!(md);
        let _ = writeln!(md, "- **Mint:** {}", self.mint);
        let _ = writeln!(md, "- **Liquidity:** {}", self.liquidity);
        let _ = writeln!(md);
        let _ = writeln!(md, "{MACHINE_READABLE_HEADING}");
        let _ = writeln!(md);
        let _ = writeln!(md, "```json");
        let _ = writeln!(md, "{json}");
        let _ = writeln!(md, "```");
        Ok(md)
    }
}

/// Write `record` into `dir` as a fresh file and return its path.
///
/// The directory is created if absent. The file is staged next to its final
/// name and persisted without clobbering; when the name is taken a
/// zero-padded suffix (`_001`, `_002`, ...) is appended so names keep sorting
/// in write order.
pub fn write_record(dir: &Path, record: &DeploymentRecord) -> Result<PathBuf, RecordError> {
    std::fs::create_dir_all(dir).map_err(|source| RecordError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let contents = record.to_markdown()?;
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| RecordError::Io { path, source }
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    staged
        .write_all(contents.as_bytes())
        .map_err(io_err(staged.path()))?;
    staged.as_file().sync_all().map_err(io_err(staged.path()))?;

    let stem = record.file_stem();
    for attempt in 0..MAX_NAME_SUFFIX {
        let name = if attempt == 0 {
            format!("{stem}.md")
        } else {
            format!("{stem}_{attempt:03}.md")
        };
        let path = dir.join(name);
        match staged.persist_noclobber(&path) {
            Ok(_) => {
                info!(path = %path.display(), "deployment record written");
                return Ok(path);
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "record name taken, trying next suffix");
                staged = e.file;
            }
            Err(e) => return Err(RecordError::Io { path, source: e.error }),
        }
    }

    Err(RecordError::Io {
        path: dir.join(format!("{stem}.md")),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free record file name",
        ),
    })
}

/// `floor(total * pct / 100)` without intermediate overflow.
pub fn mint_share(total: u128, pct: u8) -> u128 {
    let pct = u128::from(pct);
    (total / 100) * pct + (total % 100) * pct / 100
}

/// `1234567` -> `"1,234,567"`.
pub fn format_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn sanitize_symbol(symbol: &str) -> String {
    let cleaned: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "TOKEN".into()
    } else {
        cleaned.to_string()
    }
}

fn address_prefix(address: &str) -> String {
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    hex.chars().take(8).collect::<String>().to_ascii_lowercase()
}
