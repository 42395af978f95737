//! Process configuration.
//!
//! Loaded from environment variables. The private key is kept out of the
//! serializable config and read separately into a [`Credential`].

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::agents::oracle::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::adapters::safe_service::DEFAULT_SAFE_SERVICE_URL;
use crate::error::ConfigError;
use crate::hsm::Credential;
use crate::runtime::MissingProposalPolicy;

pub const ENV_PRIVATE_KEY: &str = "AGENT_PRIVATE_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_CHAIN_ID: &str = "CHAIN_ID";
pub const ENV_SAFE_SERVICE_URL: &str = "SAFE_SERVICE_URL";
pub const ENV_ORACLE_MODEL: &str = "ORACLE_MODEL";
pub const ENV_ORACLE_BASE_URL: &str = "ORACLE_BASE_URL";
pub const ENV_ORACLE_TIMEOUT: &str = "ORACLE_TIMEOUT_SECS";
pub const ENV_REQUIRE_PROPOSAL: &str = "COSIGNER_REQUIRE_PROPOSAL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CosignerConfig {
    pub openai_api_key: String,
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_safe_service_url")]
    pub safe_service_url: String,
    #[serde(default = "default_model")]
    pub oracle_model: String,
    #[serde(default = "default_oracle_base_url")]
    pub oracle_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub oracle_timeout_secs: u64,
    #[serde(default)]
    pub missing_proposal: MissingProposalPolicy,
}

fn default_chain_id() -> u64 {
    1
}

fn default_safe_service_url() -> String {
    DEFAULT_SAFE_SERVICE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_oracle_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got `{}`", other),
        }),
    }
}

impl CosignerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let chain_id = match get(ENV_CHAIN_ID) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: ENV_CHAIN_ID,
                reason: format!("{}", e),
            })?,
            None => default_chain_id(),
        };
        let oracle_timeout_secs = match get(ENV_ORACLE_TIMEOUT) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: ENV_ORACLE_TIMEOUT,
                reason: format!("{}", e),
            })?,
            None => default_timeout_secs(),
        };
        let missing_proposal = match get(ENV_REQUIRE_PROPOSAL) {
            Some(raw) if parse_bool(ENV_REQUIRE_PROPOSAL, &raw)? => {
                MissingProposalPolicy::RequireProposal
            }
            _ => MissingProposalPolicy::SignWithoutProposal,
        };

        Ok(Self {
            openai_api_key: get(ENV_OPENAI_KEY).ok_or(ConfigError::Missing(ENV_OPENAI_KEY))?,
            rpc_url: get(ENV_RPC_URL).ok_or(ConfigError::Missing(ENV_RPC_URL))?,
            chain_id,
            safe_service_url: get(ENV_SAFE_SERVICE_URL).unwrap_or_else(default_safe_service_url),
            oracle_model: get(ENV_ORACLE_MODEL).unwrap_or_else(default_model),
            oracle_base_url: get(ENV_ORACLE_BASE_URL).unwrap_or_else(default_oracle_base_url),
            oracle_timeout_secs,
            missing_proposal,
        })
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

/// Read the co-signer credential from `AGENT_PRIVATE_KEY`.
pub fn credential_from_env() -> Result<Credential, ConfigError> {
    let raw = zeroize::Zeroizing::new(required(ENV_PRIVATE_KEY)?);
    Credential::from_hex(&raw).map_err(|e| ConfigError::Invalid {
        name: ENV_PRIVATE_KEY,
        reason: e.to_string(),
    })
}

/// Log filter directive from `COSIGNER_LOG_LEVEL`, defaulting to `info`.
pub fn log_level() -> String {
    optional("COSIGNER_LOG_LEVEL").unwrap_or_else(|| "info".to_string())
}
