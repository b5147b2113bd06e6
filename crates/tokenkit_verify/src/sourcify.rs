//! Sourcify verification: status check by address, then a multipart upload of
//! the source, compiler metadata and the OpenZeppelin sources it imports.
//!
//! REST API: `<base>/check-by-addresses` (GET) and `<base>` (POST).
//! No auth.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tokenkit_chain::validate_url;
use tokenkit_core::{ContractArtifacts, Outcome, TokenkitConfig};
use tracing::{debug, info};

use crate::report_failure;
use crate::target::{VerifyTarget, lookup_url};

pub const SOURCIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Printed when Sourcify verification fails.
pub const SOURCIFY_HINTS: &[&str] = &[
    "Make sure you've compiled the contracts",
    "Check that the contract address is correct",
    "Ensure the contract was deployed with the same source code",
    "Try again in a few minutes (Sourcify might be busy)",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One entry of a `check-by-addresses` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckStatus {
    pub address: String,
    /// `"perfect"`, `"partial"` or `"false"`.
    #[serde(default)]
    pub status: Option<String>,
}

impl CheckStatus {
    pub fn is_perfect(&self) -> bool {
        self.status.as_deref() == Some("perfect")
    }
}

/// A file part of the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
    pub mime: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcifySubmission {
    pub address: String,
    pub chain_id: u64,
    pub files: Vec<SourceFile>,
}

impl SourcifySubmission {
    fn into_form(self) -> Result<Form> {
        let mut form = Form::new()
            .text("address", self.address)
            .text("chain", self.chain_id.to_string());

        for file in self.files {
            let mut part = Part::bytes(file.contents.into_bytes()).file_name(file.name);
            if let Some(mime) = file.mime {
                part = part
                    .mime_str(mime)
                    .with_context(|| format!("invalid MIME type {mime}"))?;
            }
            form = form.part("files", part);
        }
        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SourcifyApi: Send + Sync {
    async fn check_by_addresses(&self, address: &str, chain_id: u64) -> Result<Vec<CheckStatus>>;

    /// Upload for verification. Anything but HTTP 200 is an error.
    async fn submit(&self, submission: SourcifySubmission) -> Result<Value>;
}

pub struct SourcifyClient {
    base_url: String,
    client: Client,
}

impl SourcifyClient {
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !validate_url(&base_url) {
            anyhow::bail!("invalid Sourcify URL: {base_url}");
        }

        let client = Client::builder()
            .timeout(SOURCIFY_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &TokenkitConfig) -> Result<Self> {
        Self::with_base_url(&config.verify.sourcify_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_url(&self, address: &str, chain_id: u64) -> String {
        format!(
            "{}/check-by-addresses?addresses={address}&chainIds={chain_id}",
            self.base_url
        )
    }
}

#[async_trait]
impl SourcifyApi for SourcifyClient {
    async fn check_by_addresses(&self, address: &str, chain_id: u64) -> Result<Vec<CheckStatus>> {
        let url = self.check_url(address, chain_id);
        debug!(url = %url, "checking Sourcify status");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Sourcify status request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .with_context(|| format!("failed to read Sourcify response body ({status})"))?;
            anyhow::bail!("Sourcify API error ({status}): {body}");
        }

        response
            .json()
            .await
            .context("failed to parse Sourcify status response")
    }

    async fn submit(&self, submission: SourcifySubmission) -> Result<Value> {
        debug!(
            url = %self.base_url,
            address = %submission.address,
            files = submission.files.len(),
            "uploading to Sourcify"
        );
        let form = submission.into_form()?;

        let response = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await
            .context("Sourcify verification request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read Sourcify response body ({status})"))?;
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("Sourcify API error ({status}): {body}");
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

// ---------------------------------------------------------------------------
// Procedure
// ---------------------------------------------------------------------------

/// Collect the upload: contract source, `metadata.json`, then whichever
/// allow-listed OpenZeppelin sources are installed.
pub fn build_submission(
    config: &TokenkitConfig,
    target: &VerifyTarget,
    chain_id: u64,
) -> Result<SourcifySubmission> {
    let artifacts = ContractArtifacts::new(&config.paths.project_root, &target.contract_name);
    let source = artifacts.read_source()?;
    let build_info = artifacts
        .build_info()
        .context("compiler build info unavailable; compile the contracts first")?;
    let metadata = artifacts.metadata(&build_info)?;

    let mut files = vec![
        SourceFile {
            name: format!("{}.sol", artifacts.name()),
            contents: source,
            mime: None,
        },
        SourceFile {
            name: "metadata.json".into(),
            contents: metadata,
            mime: Some("application/json"),
        },
    ];
    files.extend(
        artifacts
            .openzeppelin_sources()
            .into_iter()
            .map(|(name, contents)| SourceFile {
                name,
                contents,
                mime: None,
            }),
    );

    Ok(SourcifySubmission {
        address: target.address.to_string(),
        chain_id,
        files,
    })
}

/// Verify `target` on Sourcify. Never fails; problems come back as
/// [`Outcome::Degraded`] after being logged with remediation hints.
pub async fn verify_via_sourcify<S>(
    config: &TokenkitConfig,
    target: &VerifyTarget,
    chain_id: u64,
    api: &S,
) -> Outcome
where
    S: SourcifyApi + ?Sized,
{
    let address = target.address.to_string();
    let lookup = lookup_url(&config.verify.sourcify_url, &target.address);
    info!(address = %address, chain_id, "verifying contract with Sourcify");

    match api.check_by_addresses(&address, chain_id).await {
        Ok(entries) if entries.first().is_some_and(CheckStatus::is_perfect) => {
            info!(address = %address, "contract is already verified");
            info!(url = %lookup, "view verified contract");
            return Outcome::Ok;
        }
        Ok(entries) => debug!(
            status = ?entries.first().and_then(|e| e.status.clone()),
            "contract not yet verified"
        ),
        Err(e) => info!(
            error = %format!("{e:#}"),
            "verification status unknown; proceeding with verification"
        ),
    }

    let submission = match build_submission(config, target, chain_id) {
        Ok(submission) => submission,
        Err(e) => return report_failure("Sourcify verification", &e, SOURCIFY_HINTS),
    };
    info!(files = submission.files.len(), "submitting to Sourcify");

    match api.submit(submission).await {
        Ok(result) => {
            info!(result = %result, "contract verified");
            info!(url = %lookup, "view verified contract");
            Outcome::Ok
        }
        Err(e) => report_failure("Sourcify verification", &e, SOURCIFY_HINTS),
    }
}
