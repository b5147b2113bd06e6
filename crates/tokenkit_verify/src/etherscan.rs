//! Native source verification through an Etherscan-compatible
//! `verifysourcecode` endpoint.
//!
//! Auth: `apikey` form field. Block explorers that front Sourcify accept any
//! key, hence the `no-api-key-needed` default.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokenkit_chain::validate_url;
use tokenkit_core::{ContractArtifacts, Outcome, TokenkitConfig};
use tracing::{debug, info};

use crate::report_failure;
use crate::target::{VerifyTarget, lookup_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Printed when native verification fails.
pub const NATIVE_HINTS: &[&str] = &[
    "Make sure the contract address is correct",
    "Check that TOKEN_NAME, TOKEN_SYMBOL and TOKEN_DECIMALS match the deployment",
    "Ensure CONTRACT_NAME names the deployed contract",
    "Run from the project root or set PROJECT_ROOT",
];

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// One `verifysourcecode` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVerification {
    pub contract_address: String,
    pub chain_id: u64,
    /// Standard-JSON compiler input, serialized.
    pub source_code: String,
    /// `contracts/<Name>.sol:<Name>`
    pub contract_name: String,
    pub compiler_version: String,
    /// ABI-encoded constructor arguments, hex without `0x`.
    pub constructor_arguments: String,
}

impl SourceVerification {
    fn form_fields(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", api_key.to_string()),
            ("module", "contract".into()),
            ("action", "verifysourcecode".into()),
            ("chainid", self.chain_id.to_string()),
            ("contractaddress", self.contract_address.clone()),
            ("sourceCode", self.source_code.clone()),
            ("codeformat", "solidity-standard-json-input".into()),
            ("contractname", self.contract_name.clone()),
            ("compilerversion", self.compiler_version.clone()),
            // Etherscan's spelling.
            ("constructorArguements", self.constructor_arguments.clone()),
        ]
    }
}

/// `{status, message, result}` envelope. `status` is `"1"` on success.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl ExplorerResponse {
    pub fn is_success(&self) -> bool {
        self.status == "1"
    }

    pub fn result_text(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Case-insensitive "already verified" detection across explorer wordings.
pub fn is_already_verified(message: &str) -> bool {
    message.to_lowercase().contains("already verified")
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn verify_source_code(&self, request: &SourceVerification) -> Result<ExplorerResponse>;
}

pub struct EtherscanClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl EtherscanClient {
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !validate_url(&base_url) {
            anyhow::bail!("invalid explorer API URL: {base_url}");
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &TokenkitConfig) -> Result<Self> {
        Self::with_base_url(&config.verify.explorer_api_key, &config.verify.explorer_api_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    async fn verify_source_code(&self, request: &SourceVerification) -> Result<ExplorerResponse> {
        debug!(
            url = %self.base_url,
            address = %request.contract_address,
            contract = %request.contract_name,
            "submitting verifysourcecode"
        );

        let response = self
            .client
            .post(&self.base_url)
            .form(&request.form_fields(&self.api_key))
            .send()
            .await
            .context("explorer verification request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read explorer response body ({status})"))?;
        if !status.is_success() {
            anyhow::bail!("explorer API error ({status}): {body}");
        }

        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse explorer response: {body}"))
    }
}

// ---------------------------------------------------------------------------
// Procedure
// ---------------------------------------------------------------------------

/// Assemble the submission from the compiler output on disk.
pub fn build_request(
    config: &TokenkitConfig,
    target: &VerifyTarget,
    chain_id: u64,
) -> Result<SourceVerification> {
    let artifacts = ContractArtifacts::new(&config.paths.project_root, &target.contract_name);
    let build_info = artifacts
        .build_info()
        .context("compiler build info unavailable; compile the contracts first")?;
    let source_code = serde_json::to_string(&build_info.input)
        .context("failed to serialize compiler input")?;

    Ok(SourceVerification {
        contract_address: target.address.to_string(),
        chain_id,
        source_code,
        contract_name: artifacts.fully_qualified_name(),
        compiler_version: build_info.compiler_version(),
        constructor_arguments: target.constructor_args().abi_encode_hex(),
    })
}

/// Submit `target` for native verification. Never fails; problems come back
/// as [`Outcome::Degraded`] after being logged with remediation hints.
pub async fn verify_native<E>(
    config: &TokenkitConfig,
    target: &VerifyTarget,
    chain_id: u64,
    api: &E,
) -> Outcome
where
    E: ExplorerApi + ?Sized,
{
    info!(
        address = %target.address,
        contract = %target.contract_name,
        name = %target.token_name,
        symbol = %target.token_symbol,
        decimals = target.decimals,
        chain_id,
        "verifying contract source"
    );

    let request = match build_request(config, target, chain_id) {
        Ok(request) => request,
        Err(e) => return report_failure("native verification", &e, NATIVE_HINTS),
    };

    let submitted = api
        .verify_source_code(&request)
        .await
        .and_then(|response| {
            if response.is_success() {
                Ok(response)
            } else {
                anyhow::bail!("{}: {}", response.message, response.result_text())
            }
        });

    let lookup = lookup_url(&config.verify.sourcify_url, &target.address);
    match submitted {
        Ok(response) => {
            info!(result = %response.result_text(), "contract verification submitted");
            info!(url = %lookup, "view verified contract");
            Outcome::Ok
        }
        Err(e) if is_already_verified(&format!("{e:#}")) => {
            info!(address = %target.address, "contract is already verified");
            info!(url = %lookup, "view verified contract");
            Outcome::Ok
        }
        Err(e) => report_failure("native verification", &e, NATIVE_HINTS),
    }
}
