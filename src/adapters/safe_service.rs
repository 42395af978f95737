//! Safe Transaction Service client.
//!
//! Speaks the `/api/v1` REST surface of the Safe Transaction Service. Numeric
//! fields arrive as either JSON numbers or decimal strings depending on the
//! service version, so they are parsed leniently.

use core::str::FromStr;

use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::CoordinationService;
use crate::error::TransportError;
use crate::types::{parse_u256, PendingTransaction, ProposalConfirmation, SafeTransactionData};

/// Default Safe Transaction Service endpoint (Ethereum mainnet).
pub const DEFAULT_SAFE_SERVICE_URL: &str = "https://safe-transaction-mainnet.safe.global";

/// HTTP client for the Safe Transaction Service.
#[derive(Clone)]
pub struct SafeTransactionService {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultisigTransactionDto {
    safe_tx_hash: String,
    to: String,
    value: Value,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    operation: u8,
    #[serde(default)]
    safe_tx_gas: Value,
    #[serde(default)]
    base_gas: Value,
    #[serde(default)]
    gas_price: Value,
    #[serde(default)]
    gas_token: Option<String>,
    #[serde(default)]
    refund_receiver: Option<String>,
    #[serde(default)]
    nonce: Value,
    #[serde(default)]
    confirmations_required: Option<u32>,
    #[serde(default)]
    confirmations: Option<Vec<ConfirmationDto>>,
}

#[derive(Deserialize)]
struct ConfirmationDto {
    owner: String,
    #[serde(default)]
    signature: Option<String>,
}

#[derive(Deserialize)]
struct SafeInfoDto {
    threshold: u32,
}

fn decode_err(field: &str, reason: impl core::fmt::Display) -> TransportError {
    TransportError::Decode(format!("{}: {}", field, reason))
}

fn parse_address(field: &str, raw: Option<&str>) -> Result<Address, TransportError> {
    match raw {
        None | Some("") => Ok(Address::zero()),
        Some(s) => Address::from_str(s).map_err(|e| decode_err(field, e)),
    }
}

fn parse_hex_bytes(field: &str, raw: Option<&str>) -> Result<Vec<u8>, TransportError> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) => hex::decode(s.trim_start_matches("0x")).map_err(|e| decode_err(field, e)),
    }
}

fn parse_amount(field: &str, raw: &Value) -> Result<ethers::types::U256, TransportError> {
    if raw.is_null() {
        return Ok(ethers::types::U256::zero());
    }
    parse_u256(raw).map_err(|e| decode_err(field, e))
}

impl MultisigTransactionDto {
    fn into_pending(self) -> Result<PendingTransaction, TransportError> {
        let confirmations = self
            .confirmations
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                Ok(ProposalConfirmation {
                    owner: parse_address("owner", Some(c.owner.as_str()))?,
                    signature: parse_hex_bytes("signature", c.signature.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, TransportError>>()?;

        let nonce = match &self.nonce {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };

        let proposal = SafeTransactionData {
            to: parse_address("to", Some(self.to.as_str()))?,
            value: parse_amount("value", &self.value)?,
            data: parse_hex_bytes("data", self.data.as_deref())?,
            operation: self.operation,
            safe_tx_gas: parse_amount("safeTxGas", &self.safe_tx_gas)?,
            base_gas: parse_amount("baseGas", &self.base_gas)?,
            gas_price: parse_amount("gasPrice", &self.gas_price)?,
            gas_token: parse_address("gasToken", self.gas_token.as_deref())?,
            refund_receiver: parse_address("refundReceiver", self.refund_receiver.as_deref())?,
            confirmations,
        };

        Ok(PendingTransaction {
            transaction_hash: self.safe_tx_hash,
            confirmations_count: proposal.confirmations.len() as u32,
            required_threshold: self.confirmations_required.unwrap_or(0),
            nonce,
            proposal: Some(proposal),
        })
    }
}

impl SafeTransactionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The service only accepts checksummed addresses in paths.
    fn wallet_path(wallet: &str) -> String {
        Address::from_str(wallet)
            .map(|a| to_checksum(&a, None))
            .unwrap_or_else(|_| wallet.to_string())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, TransportError> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        Self::check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(Into::into)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    fn transaction_url(&self, tx_hash: &str) -> String {
        format!("{}/api/v1/multisig-transactions/{}/", self.base_url, tx_hash)
    }
}

/// Map a non-2xx response onto a transport error. 404 is "no such resource".
fn status_error(status: StatusCode, body: String) -> TransportError {
    if status == StatusCode::NOT_FOUND {
        TransportError::NotFound
    } else {
        TransportError::Status {
            code: status.as_u16(),
            body,
        }
    }
}

/// The service refuses a second signature from the same owner with a client
/// error whose body says the signature already exists.
fn confirmation_error(tx_hash: &str, err: TransportError) -> TransportError {
    match err {
        TransportError::Status { code, ref body }
            if matches!(code, 400 | 409 | 422) && body.to_lowercase().contains("already exist") =>
        {
            TransportError::AlreadyConfirmed(tx_hash.to_string())
        }
        other => other,
    }
}

#[async_trait]
impl CoordinationService for SafeTransactionService {
    async fn list(&self, wallet: &str) -> Result<Vec<PendingTransaction>, TransportError> {
        let mut url = format!(
            "{}/api/v1/safes/{}/multisig-transactions/?executed=false",
            self.base_url,
            Self::wallet_path(wallet)
        );
        let mut pending = Vec::new();

        loop {
            let page: Page<MultisigTransactionDto> = self.get_json(&url).await?;
            for dto in page.results {
                pending.push(dto.into_pending()?);
            }
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        pending.sort_by_key(|p| p.nonce.unwrap_or(u64::MAX));
        Ok(pending)
    }

    async fn get(&self, tx_hash: &str) -> Result<PendingTransaction, TransportError> {
        let detail: MultisigTransactionDto = self.get_json(&self.transaction_url(tx_hash)).await?;
        detail.into_pending()
    }

    async fn confirm(
        &self,
        tx_hash: &str,
        owner: Address,
        signature: &[u8],
    ) -> Result<PendingTransaction, TransportError> {
        let url = format!("{}confirmations/", self.transaction_url(tx_hash));
        debug!(%url, owner = ?owner, "POST confirmation");
        let response = self
            .http
            .post(&url)
            .json(&json!({ "signature": format!("0x{}", hex::encode(signature)) }))
            .send()
            .await?;
        Self::check_status(response)
            .await
            .map_err(|e| confirmation_error(tx_hash, e))?;

        // Re-read so the count and the confirmation list come from one snapshot.
        self.get(tx_hash).await
    }

    async fn threshold(&self, wallet: &str) -> Result<u32, TransportError> {
        let info: SafeInfoDto = self
            .get_json(&format!("{}/api/v1/safes/{}/", self.base_url, Self::wallet_path(wallet)))
            .await?;
        Ok(info.threshold)
    }
}
