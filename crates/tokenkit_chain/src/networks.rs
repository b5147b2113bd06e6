use serde::{Deserialize, Serialize};
use tokenkit_core::NetworkSelection;
use tracing::debug;

const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
const LOCAL_CHAIN_ID: u64 = 31337;

/// A resolved network: where to send transactions and how to label them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Local development nodes are never submitted for source verification.
    pub is_local: bool,
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Block explorer page for `address`, when the network has an explorer.
    pub fn address_url(&self, address: &impl std::fmt::Display) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/address/{address}", base.trim_end_matches('/')))
    }
}

/// Built-in network definitions.
pub fn known_networks() -> Vec<NetworkConfig> {
    vec![
        NetworkConfig {
            name: "hardhat".into(),
            chain_id: LOCAL_CHAIN_ID,
            rpc_url: LOCAL_RPC_URL.into(),
            is_local: true,
            explorer_url: None,
        },
        NetworkConfig {
            name: "localhost".into(),
            chain_id: LOCAL_CHAIN_ID,
            rpc_url: LOCAL_RPC_URL.into(),
            is_local: true,
            explorer_url: None,
        },
        NetworkConfig {
            name: "hyperliquid".into(),
            chain_id: 999,
            rpc_url: "https://rpc.hyperliquid.xyz/evm".into(),
            is_local: false,
            explorer_url: Some("https://purrsec.com".into()),
        },
    ]
}

/// Turn a network selection into a concrete endpoint.
///
/// Known names take their built-in defaults, which `RPC_URL` / `CHAIN_ID`
/// override. Any other name needs both overrides.
pub fn resolve_network(selection: &NetworkSelection) -> anyhow::Result<NetworkConfig> {
    let known = known_networks()
        .into_iter()
        .find(|n| n.name.eq_ignore_ascii_case(&selection.name));

    let mut network = match known {
        Some(network) => network,
        None => {
            let (Some(rpc_url), Some(chain_id)) = (&selection.rpc_url, selection.chain_id) else {
                anyhow::bail!(
                    "unknown network '{}': set RPC_URL and CHAIN_ID to use a custom network",
                    selection.name
                );
            };
            NetworkConfig {
                name: selection.name.clone(),
                chain_id,
                rpc_url: rpc_url.clone(),
                is_local: is_loopback(rpc_url),
                explorer_url: None,
            }
        }
    };

    if let Some(url) = &selection.rpc_url {
        network.rpc_url = url.clone();
        network.is_local = is_loopback(url);
    }
    if let Some(chain_id) = selection.chain_id {
        network.chain_id = chain_id;
    }

    if !validate_url(&network.rpc_url) {
        anyhow::bail!("invalid RPC URL: {}", network.rpc_url);
    }

    debug!(network = %network.name, chain_id = network.chain_id, rpc = %network.rpc_url, "network resolved");
    Ok(network)
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

fn is_loopback(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| matches!(h, "localhost" | "127.0.0.1" | "[::1]")))
        .unwrap_or(false)
}
