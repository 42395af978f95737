//! Threshold aggregator.
//!
//! Compares a proposal's confirmation count against the wallet threshold and
//! fires execution exactly once when it is met. Failed executions are not
//! retried.

use std::sync::Arc;

use tracing::info;

use crate::adapters::{CoordinationService, TransactionExecutor};
use crate::error::{ConfirmationError, CosignerError};
use crate::types::{ExecutionReceipt, PendingTransaction};

#[derive(Clone)]
pub struct ThresholdExecutor {
    service: Arc<dyn CoordinationService>,
    executor: Arc<dyn TransactionExecutor>,
}

impl ThresholdExecutor {
    pub fn new(
        service: Arc<dyn CoordinationService>,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Self {
        Self { service, executor }
    }

    /// Confirmations `wallet` requires before execution.
    pub async fn threshold(&self, wallet: &str) -> Result<u32, ConfirmationError> {
        self.service
            .threshold(wallet)
            .await
            .map_err(|source| ConfirmationError::Threshold {
                wallet: wallet.to_string(),
                source,
            })
    }

    /// Execute `pending` if its (post-confirmation) count meets the wallet threshold.
    ///
    /// `Ok(None)` means the proposal still awaits other co-signers.
    pub async fn try_execute(
        &self,
        wallet: &str,
        pending: &PendingTransaction,
    ) -> Result<Option<ExecutionReceipt>, CosignerError> {
        let threshold = self.threshold(wallet).await?;
        self.execute_if_ready(wallet, pending, threshold).await
    }

    /// As [`try_execute`](Self::try_execute), against an already known threshold.
    pub async fn execute_if_ready(
        &self,
        wallet: &str,
        pending: &PendingTransaction,
        threshold: u32,
    ) -> Result<Option<ExecutionReceipt>, CosignerError> {
        if pending.confirmations_count < threshold {
            info!(
                wallet,
                tx_hash = %pending.transaction_hash,
                confirmations = pending.confirmations_count,
                threshold,
                "awaiting further co-signers"
            );
            return Ok(None);
        }

        info!(
            wallet,
            tx_hash = %pending.transaction_hash,
            confirmations = pending.confirmations_count,
            threshold,
            "threshold met, executing"
        );
        let receipt = self.executor.execute(wallet, pending).await?;
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCoordinator;
    use crate::error::ExecutionError;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    async fn setup(
        threshold: u32,
        confirmations: u32,
    ) -> (Arc<InMemoryCoordinator>, ThresholdExecutor, PendingTransaction) {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        coordinator.add_wallet(WALLET, threshold).await;
        let pending = PendingTransaction::new("0xfeed", confirmations, threshold);
        coordinator.propose(WALLET, pending.clone()).await;
        let aggregator = ThresholdExecutor::new(coordinator.clone(), coordinator.clone());
        (coordinator, aggregator, pending)
    }

    #[tokio::test]
    async fn test_below_threshold_is_not_executed() {
        let (coordinator, aggregator, pending) = setup(3, 2).await;
        assert_eq!(aggregator.try_execute(WALLET, &pending).await.unwrap(), None);
        assert!(coordinator.executions().await.is_empty());
    }

    #[tokio::test]
    async fn test_at_threshold_executes_once() {
        let (coordinator, aggregator, pending) = setup(3, 3).await;
        let receipt = aggregator.try_execute(WALLET, &pending).await.unwrap().unwrap();
        assert_eq!(receipt.transaction_hash, "exec:0xfeed");
        assert_eq!(coordinator.executions().await, vec!["0xfeed".to_string()]);
    }

    #[tokio::test]
    async fn test_execution_failure_is_fatal() {
        let (coordinator, aggregator, pending) = setup(1, 1).await;
        coordinator.fail_execute_with(ExecutionError::Reverted("0xdead".into())).await;

        let err = aggregator.try_execute(WALLET, &pending).await.unwrap_err();
        assert!(matches!(err, CosignerError::Execution(ExecutionError::Reverted(_))));
        assert!(coordinator.executions().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_wallet_threshold_is_confirmation_error() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let aggregator = ThresholdExecutor::new(coordinator.clone(), coordinator);
        let err = aggregator
            .try_execute(WALLET, &PendingTransaction::new("0x01", 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CosignerError::Confirmation(ConfirmationError::Threshold { .. })));
    }

    #[tokio::test]
    async fn test_known_threshold_is_not_reread() {
        let (coordinator, aggregator, pending) = setup(3, 2).await;
        // a lower threshold passed in wins over the wallet's configured one
        let receipt = aggregator
            .execute_if_ready(WALLET, &pending, 2)
            .await
            .unwrap();
        assert!(receipt.is_some());
        assert_eq!(coordinator.executions().await.len(), 1);
    }
}
