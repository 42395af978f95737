//! # Safe Co-Signer
//!
//! Automated co-signer for multisig wallets.
//!
//! Transactions arrive pre-classified by an upstream screening process
//! (`blocked`, `approved`, `warning`). The [`DecisionEngine`] turns each one
//! into a single [`DecisionOutcome`]: reject, sign and confirm, or ask a
//! reasoning oracle to adjudicate first.
//!
//! ## Components
//!
//! - **Reasoning adjudicator** ([`agents`]): fixed prompt, permissive verdict extraction
//! - **Signature provider** ([`hsm`]): deterministic secp256k1 signature over `(to, value)`
//! - **Pending-transaction tracker** ([`runtime::tracker`]): lists and confirms proposals
//! - **Threshold executor** ([`runtime::threshold`]): executes once the threshold is met
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use safe_cosigner::adapters::{InMemoryCoordinator, ScriptedOracle};
//! use safe_cosigner::{Credential, DecisionEngine, ScreeningStatus, TransactionRequest};
//!
//! # async fn run() -> safe_cosigner::Result<()> {
//! let credential =
//!     Credential::from_hex("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")?;
//! let coordinator = Arc::new(InMemoryCoordinator::new());
//! let engine = DecisionEngine::new(
//!     credential,
//!     Arc::new(ScriptedOracle::answering("YES")),
//!     coordinator.clone(),
//!     coordinator,
//! );
//!
//! let request = TransactionRequest::new(
//!     ScreeningStatus::Approved,
//!     "known counterparty",
//!     "monthly payroll",
//!     serde_json::json!({"to": "0x00000000000000000000000000000000000000aa", "value": 1000}),
//!     "0x1111111111111111111111111111111111111111",
//! );
//! let outcome = engine.decide(&request).await;
//! assert!(outcome.is_signed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! - The credential is zeroized on drop and never logged
//! - Signatures are deterministic (RFC 6979) for identical payload and credential
//! - Confirmations are not submitted once a proposal already meets its threshold

pub mod adapters;
pub mod agents;
pub mod config;
pub mod error;
pub mod hsm;
pub mod runtime;
pub mod types;

pub use config::CosignerConfig;
pub use error::{CosignerError, Result};
pub use hsm::{Credential, SignatureProvider};
pub use runtime::{DecisionEngine, MissingProposalPolicy};
pub use types::{
    AdjudicationResult, Decision, DecisionOutcome, ExecutionReceipt, PendingTransaction,
    ScreeningStatus, TransactionRequest,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::adapters::{InMemoryCoordinator, ScriptedOracle};
    use serde_json::json;
    use std::sync::Arc;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const SAFE_TX_HASH: &str =
        "0xfeed000000000000000000000000000000000000000000000000000000000001";

    fn request(status: ScreeningStatus) -> TransactionRequest {
        TransactionRequest::new(
            status,
            "screening note",
            "operator note",
            json!({"to": "0x00000000000000000000000000000000000000aa", "value": 10}),
            WALLET,
        )
    }

    #[tokio::test]
    async fn test_full_flow() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        coordinator.add_wallet(WALLET, 2).await;
        coordinator
            .propose(WALLET, PendingTransaction::new(SAFE_TX_HASH, 1, 2))
            .await;

        let engine = DecisionEngine::new(
            Credential::from_hex(KEY).unwrap(),
            Arc::new(ScriptedOracle::answering("YES")),
            coordinator.clone(),
            coordinator.clone(),
        );

        let outcome = engine.decide(&request(ScreeningStatus::Approved)).await;
        assert_eq!(outcome.decision, Decision::SignedExecuted);
        assert_eq!(outcome.agent_reason, "Transaction approved: screening note");
        assert_eq!(outcome.confirmed_transaction.as_deref(), Some(SAFE_TX_HASH));
        assert!(outcome.receipt.is_some());
        assert_eq!(coordinator.executions().await, vec![SAFE_TX_HASH.to_string()]);
    }

    #[tokio::test]
    async fn test_blocked_never_touches_collaborators() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let oracle = Arc::new(ScriptedOracle::answering("YES"));
        let engine = DecisionEngine::new(
            Credential::from_hex(KEY).unwrap(),
            oracle.clone(),
            coordinator.clone(),
            coordinator.clone(),
        );

        let outcome = engine.decide(&request(ScreeningStatus::Blocked)).await;
        assert_eq!(outcome.decision, Decision::Rejected);
        assert_eq!(outcome.signature, None);
        assert_eq!(oracle.calls(), 0);
        assert!(coordinator.confirmations().await.is_empty());
    }
}
