//! Coordination-service and execution adapters.
//!
//! The decision engine only sees the two traits below; concrete clients live
//! in the submodules.

use async_trait::async_trait;
use ethers::types::Address;

use crate::error::{ExecutionError, TransportError};
use crate::types::{ExecutionReceipt, PendingTransaction};

pub mod ethereum;
pub mod memory;
pub mod safe_service;

pub use ethereum::EthereumExecutor;
pub use memory::{InMemoryCoordinator, ScriptedOracle};
pub use safe_service::SafeTransactionService;

/// External system tracking proposed multisig transactions and their confirmations.
///
/// Implementations must report a missing wallet as [`TransportError::NotFound`]
/// from [`CoordinationService::list`], and a second confirmation by the same
/// owner as [`TransportError::AlreadyConfirmed`].
#[async_trait]
pub trait CoordinationService: Send + Sync {
    /// Transactions awaiting confirmation for `wallet`.
    async fn list(&self, wallet: &str) -> Result<Vec<PendingTransaction>, TransportError>;

    /// A single proposal, with every confirmation recorded so far.
    async fn get(&self, tx_hash: &str) -> Result<PendingTransaction, TransportError>;

    /// Attach `owner`'s `signature` to the proposal `tx_hash`; returns the
    /// proposal as the service holds it after the call.
    async fn confirm(
        &self,
        tx_hash: &str,
        owner: Address,
        signature: &[u8],
    ) -> Result<PendingTransaction, TransportError>;

    /// Number of confirmations `wallet` requires before execution.
    async fn threshold(&self, wallet: &str) -> Result<u32, TransportError>;
}

/// Submits a fully confirmed proposal for execution and waits for finalization.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn execute(
        &self,
        wallet: &str,
        pending: &PendingTransaction,
    ) -> Result<ExecutionReceipt, ExecutionError>;
}
