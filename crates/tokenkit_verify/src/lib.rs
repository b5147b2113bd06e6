pub mod etherscan;
pub mod sourcify;
pub mod target;

pub use etherscan::{
    EtherscanClient, ExplorerApi, ExplorerResponse, NATIVE_HINTS, SourceVerification,
    is_already_verified, verify_native,
};
pub use sourcify::{
    CheckStatus, SOURCIFY_HINTS, SourceFile, SourcifyApi, SourcifyClient, SourcifySubmission,
    verify_via_sourcify,
};
pub use target::{VerifyTarget, lookup_url, resolve_target};

use tokenkit_core::Outcome;
use tracing::{error, warn};

/// Log a failed verification with its remediation hints and degrade.
pub(crate) fn report_failure(procedure: &str, err: &anyhow::Error, hints: &[&str]) -> Outcome {
    error!(error = %format!("{err:#}"), "{procedure} failed");
    for (i, hint) in hints.iter().enumerate() {
        warn!("troubleshooting {}: {hint}", i + 1);
    }
    Outcome::degraded(err)
}
