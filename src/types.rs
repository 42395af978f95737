//! Core data model for the co-signer.
//!
//! Requests arrive pre-classified by an upstream screening step. Every request
//! produces exactly one [`DecisionOutcome`]; nothing here is retained across
//! requests.

use core::fmt;
use core::str::FromStr;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CosignerError, SigningError};

/// Risk classification assigned by the upstream screening process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningStatus {
    Blocked,
    Approved,
    Warning,
}

impl fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScreeningStatus::Blocked => "blocked",
            ScreeningStatus::Approved => "approved",
            ScreeningStatus::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// A classified transaction awaiting a co-signing decision.
///
/// Field names on the wire follow the screening service (`bot_reason`,
/// `reason`, `txpayload`, `safeAddress`, `erc20TokenAddress`); the camelCase
/// names are accepted as aliases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub status: ScreeningStatus,
    /// Screening rationale. Informative only.
    #[serde(rename = "bot_reason", alias = "botReason")]
    pub bot_reason: String,
    /// Operator instruction. Has override authority during adjudication.
    #[serde(rename = "reason", alias = "primaryReason")]
    pub primary_reason: String,
    #[serde(rename = "txpayload", alias = "payload", default)]
    pub payload: Value,
    #[serde(rename = "safeAddress", alias = "walletAddress")]
    pub wallet_address: String,
    #[serde(
        rename = "erc20TokenAddress",
        alias = "tokenAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token_address: Option<String>,
}

impl TransactionRequest {
    pub fn new(
        status: ScreeningStatus,
        bot_reason: impl Into<String>,
        primary_reason: impl Into<String>,
        payload: Value,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            status,
            bot_reason: bot_reason.into(),
            primary_reason: primary_reason.into(),
            payload,
            wallet_address: wallet_address.into(),
            token_address: None,
        }
    }

    pub fn with_token(mut self, token_address: impl Into<String>) -> Self {
        self.token_address = Some(token_address.into());
        self
    }

    /// Parse a request from its JSON wire form.
    pub fn from_json(input: &str) -> Result<Self, CosignerError> {
        serde_json::from_str(input).map_err(|e| CosignerError::InvalidRequest(e.to_string()))
    }
}

/// The fields of a payload that take part in the signed digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxPayload {
    pub to: Address,
    pub value: U256,
}

impl TxPayload {
    /// Extract `to` and `value` from an opaque payload.
    ///
    /// `value` may be a JSON number, a decimal string or a `0x` hex string.
    pub fn from_value(payload: &Value) -> Result<Self, SigningError> {
        let to = match payload.get("to") {
            Some(Value::String(s)) => Address::from_str(s).map_err(|e| SigningError::InvalidField {
                field: "to",
                reason: e.to_string(),
            })?,
            Some(other) => {
                return Err(SigningError::InvalidField {
                    field: "to",
                    reason: format!("expected address string, got {}", other),
                })
            }
            None => return Err(SigningError::MissingField("to")),
        };

        let value = match payload.get("value") {
            Some(v) => parse_u256(v).map_err(|reason| SigningError::InvalidField {
                field: "value",
                reason,
            })?,
            None => return Err(SigningError::MissingField("value")),
        };

        Ok(Self { to, value })
    }
}

/// Parse an unsigned 256-bit integer from a JSON number or string.
pub(crate) fn parse_u256(v: &Value) -> Result<U256, String> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("{} is not an unsigned integer", n)),
        Value::String(s) => parse_u256_str(s),
        other => Err(format!("expected integer, got {}", other)),
    }
}

pub(crate) fn parse_u256_str(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex_digits, 16).map_err(|e| e.to_string())
    } else {
        U256::from_dec_str(s).map_err(|e| e.to_string())
    }
}

/// A confirmation already recorded against a pending proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalConfirmation {
    pub owner: Address,
    pub signature: Vec<u8>,
}

/// The Safe transaction fields needed to execute a proposal on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeTransactionData {
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub operation: u8,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub confirmations: Vec<ProposalConfirmation>,
}

/// A proposal the coordination service is collecting confirmations for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub transaction_hash: String,
    pub confirmations_count: u32,
    pub required_threshold: u32,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub proposal: Option<SafeTransactionData>,
}

impl PendingTransaction {
    pub fn new(
        transaction_hash: impl Into<String>,
        confirmations_count: u32,
        required_threshold: u32,
    ) -> Self {
        Self {
            transaction_hash: transaction_hash.into(),
            confirmations_count,
            required_threshold,
            nonce: None,
            proposal: None,
        }
    }

    pub fn with_proposal(mut self, proposal: SafeTransactionData) -> Self {
        self.proposal = Some(proposal);
        self
    }

    /// Record a fresh confirmation by `owner` and bump the count.
    pub fn record_confirmation(&mut self, owner: Address, signature: Vec<u8>) {
        self.confirmations_count += 1;
        if let Some(proposal) = self.proposal.as_mut() {
            proposal.confirmations.push(ProposalConfirmation { owner, signature });
        }
    }

    /// Whether `owner` already appears among the recorded confirmations.
    pub fn confirmed_by(&self, owner: Address) -> bool {
        self.proposal
            .as_ref()
            .map(|p| p.confirmations.iter().any(|c| c.owner == owner))
            .unwrap_or(false)
    }

    /// Whether this proposal moves exactly the destination and value of `payload`.
    ///
    /// Proposals without structured data never match.
    pub fn matches(&self, payload: &TxPayload) -> bool {
        self.proposal
            .as_ref()
            .map(|p| p.to == payload.to && p.value == payload.value)
            .unwrap_or(false)
    }
}

/// Verdict of the reasoning oracle for a `warning` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjudicationResult {
    pub verdict: bool,
    /// Full oracle response, kept verbatim for audit.
    pub rationale: String,
}

/// Confirmation that a proposal was executed on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// Terminal state of one decision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Rejected,
    /// Signed; the proposal still awaits other co-signers (or none was on file).
    SignedPending,
    SignedExecuted,
    Failed,
}

/// The engine's sole output. Always fully populated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    #[serde(with = "hex_signature")]
    pub signature: Option<Vec<u8>>,
    pub agent_reason: String,
    #[serde(default)]
    pub receipt: Option<ExecutionReceipt>,
    /// Hash of the pending proposal this signature was confirmed against.
    ///
    /// `None` on a signed outcome means the signature was produced without
    /// any coordinated proposal to attach it to.
    #[serde(default)]
    pub confirmed_transaction: Option<String>,
}

impl DecisionOutcome {
    pub fn rejected(agent_reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Rejected,
            signature: None,
            agent_reason: agent_reason.into(),
            receipt: None,
            confirmed_transaction: None,
        }
    }

    pub fn failed(err: &CosignerError) -> Self {
        Self {
            decision: Decision::Failed,
            signature: None,
            agent_reason: format!("Transaction not signed: {}", err),
            receipt: None,
            confirmed_transaction: None,
        }
    }

    pub fn signed(
        signature: Vec<u8>,
        agent_reason: impl Into<String>,
        confirmed_transaction: Option<String>,
        receipt: Option<ExecutionReceipt>,
    ) -> Self {
        let decision = if receipt.is_some() {
            Decision::SignedExecuted
        } else {
            Decision::SignedPending
        };
        Self {
            decision,
            signature: Some(signature),
            agent_reason: agent_reason.into(),
            receipt,
            confirmed_transaction,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Signature as `0x`-prefixed hex.
    pub fn signature_hex(&self) -> Option<String> {
        self.signature.as_ref().map(|s| format!("0x{}", hex::encode(s)))
    }
}

mod hex_signature {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        sig: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match sig {
            Some(bytes) => serializer.serialize_some(&format!("0x{}", hex::encode(bytes))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom))
            .transpose()
    }
}
