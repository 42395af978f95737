//! The decision engine.
//!
//! Turns a classified [`TransactionRequest`] into exactly one
//! [`DecisionOutcome`]:
//!
//! | status     | action                                  | outcome                          |
//! |------------|-----------------------------------------|----------------------------------|
//! | `blocked`  | none                                    | `Rejected`                       |
//! | `approved` | sign, confirm, threshold check          | `SignedPending` / `SignedExecuted` |
//! | `warning`  | adjudicate, then as `approved` if YES   | as above, or `Rejected`          |
//!
//! Any error along the way becomes `Failed`. Nothing is retained between
//! calls, so a single engine can serve concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::threshold::ThresholdExecutor;
use super::tracker::PendingTransactionTracker;
use crate::adapters::{
    CoordinationService, EthereumExecutor, SafeTransactionService, TransactionExecutor,
};
use crate::agents::{OpenAiOracle, ReasoningAdjudicator, ReasoningOracle};
use crate::config::CosignerConfig;
use crate::error::Result;
use crate::hsm::{Credential, SignatureProvider};
use crate::types::{DecisionOutcome, ScreeningStatus, TransactionRequest, TxPayload};

/// What to do when a request should be signed but the coordination service
/// holds no matching proposal for the wallet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProposalPolicy {
    /// Return the signature anyway (`SignedPending` with no confirmed proposal).
    #[default]
    SignWithoutProposal,
    /// Refuse to sign without a proposal to attach the signature to.
    RequireProposal,
}

/// Co-signing decision engine.
pub struct DecisionEngine {
    adjudicator: ReasoningAdjudicator,
    signer: SignatureProvider,
    credential: Credential,
    tracker: PendingTransactionTracker,
    aggregator: ThresholdExecutor,
    missing_proposal: MissingProposalPolicy,
}

impl DecisionEngine {
    pub fn new(
        credential: Credential,
        oracle: Arc<dyn ReasoningOracle>,
        coordination: Arc<dyn CoordinationService>,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Self {
        Self {
            adjudicator: ReasoningAdjudicator::new(oracle),
            signer: SignatureProvider::new(),
            credential,
            tracker: PendingTransactionTracker::new(coordination.clone()),
            aggregator: ThresholdExecutor::new(coordination, executor),
            missing_proposal: MissingProposalPolicy::default(),
        }
    }

    /// Wire the HTTP oracle, Safe Transaction Service and RPC executor from config.
    pub fn from_config(config: &CosignerConfig, credential: Credential) -> Result<Self> {
        let http = reqwest::Client::new();
        let oracle = OpenAiOracle::with_client(
            http.clone(),
            config.oracle_base_url.clone(),
            config.openai_api_key.clone(),
            config.oracle_model.clone(),
        );
        let coordination =
            SafeTransactionService::with_client(http, config.safe_service_url.clone());
        let executor = EthereumExecutor::new(&config.rpc_url, &credential, config.chain_id)?;

        Ok(Self::new(credential, Arc::new(oracle), Arc::new(coordination), Arc::new(executor))
            .with_oracle_timeout(config.oracle_timeout())
            .with_missing_proposal_policy(config.missing_proposal))
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.adjudicator.set_timeout(timeout);
        self
    }

    pub fn with_missing_proposal_policy(mut self, policy: MissingProposalPolicy) -> Self {
        self.missing_proposal = policy;
        self
    }

    /// Address this engine co-signs as.
    pub fn signer_address(&self) -> Result<Address> {
        Ok(self.credential.address()?)
    }

    /// Decide on `request`. Never fails: errors become a `Failed` outcome.
    pub async fn decide(&self, request: &TransactionRequest) -> DecisionOutcome {
        match self.evaluate(request).await {
            Ok(outcome) => {
                info!(
                    wallet = %request.wallet_address,
                    status = %request.status,
                    decision = ?outcome.decision,
                    "decision reached"
                );
                outcome
            }
            Err(err) => {
                error!(
                    wallet = %request.wallet_address,
                    status = %request.status,
                    error = %err,
                    "transaction not signed"
                );
                DecisionOutcome::failed(&err)
            }
        }
    }

    async fn evaluate(&self, request: &TransactionRequest) -> Result<DecisionOutcome> {
        match request.status {
            ScreeningStatus::Blocked => Ok(DecisionOutcome::rejected(format!(
                "Transaction rejected: {}",
                request.bot_reason
            ))),
            ScreeningStatus::Approved => {
                let reason = format!("Transaction approved: {}", request.bot_reason);
                self.sign_and_confirm(request, reason).await
            }
            ScreeningStatus::Warning => {
                let adjudication = self.adjudicator.adjudicate(request).await?;
                if adjudication.verdict {
                    self.sign_and_confirm(request, adjudication.rationale).await
                } else {
                    Ok(DecisionOutcome::rejected(adjudication.rationale))
                }
            }
        }
    }

    async fn sign_and_confirm(
        &self,
        request: &TransactionRequest,
        reason: String,
    ) -> Result<DecisionOutcome> {
        let wallet = request.wallet_address.as_str();
        let payload = TxPayload::from_value(&request.payload)?;
        let signature = self.signer.sign_payload(&payload, &self.credential)?;

        let Some(pending) = self.tracker.find_matching(wallet, &payload).await? else {
            return Ok(match self.missing_proposal {
                MissingProposalPolicy::SignWithoutProposal => {
                    warn!(wallet, "no pending proposal; returning signature without confirmation");
                    DecisionOutcome::signed(signature, reason, None, None)
                }
                MissingProposalPolicy::RequireProposal => DecisionOutcome::rejected(format!(
                    "Transaction not signed: no pending proposal for wallet {}",
                    wallet
                )),
            });
        };

        let owner = self.credential.address()?;
        let threshold = self.aggregator.threshold(wallet).await?;
        let tx_hash = pending.transaction_hash.clone();

        let (pending, confirmed) = if pending.confirmed_by(owner) {
            info!(wallet, %tx_hash, "already confirmed by this signer");
            (pending, Some(tx_hash))
        } else if pending.confirmations_count >= threshold {
            info!(wallet, %tx_hash, threshold, "already at threshold; not confirming");
            (pending, None)
        } else {
            let approval = self.signer.sign_safe_tx_hash(&tx_hash, &self.credential)?;
            let updated = self.tracker.confirm(&tx_hash, owner, &approval).await?;
            info!(
                wallet,
                %tx_hash,
                confirmations = updated.confirmations_count,
                "confirmation recorded"
            );
            (updated, Some(tx_hash))
        };

        let receipt = self
            .aggregator
            .execute_if_ready(wallet, &pending, threshold)
            .await?;
        Ok(DecisionOutcome::signed(signature, reason, confirmed, receipt))
    }
}
