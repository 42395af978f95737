//! Pending-transaction tracker.
//!
//! Thin layer over [`CoordinationService`] that normalizes a "not found"
//! listing into an empty result and wraps every other transport failure in a
//! [`ConfirmationError`].

use std::sync::Arc;

use ethers::types::Address;
use tracing::debug;

use crate::adapters::CoordinationService;
use crate::error::{ConfirmationError, TransportError};
use crate::types::{PendingTransaction, TxPayload};

#[derive(Clone)]
pub struct PendingTransactionTracker {
    service: Arc<dyn CoordinationService>,
}

impl PendingTransactionTracker {
    pub fn new(service: Arc<dyn CoordinationService>) -> Self {
        Self { service }
    }

    /// Proposals awaiting confirmation for `wallet`; empty when the service
    /// does not know the wallet.
    pub async fn list_pending(
        &self,
        wallet: &str,
    ) -> Result<Vec<PendingTransaction>, ConfirmationError> {
        match self.service.list(wallet).await {
            Ok(pending) => Ok(pending),
            Err(TransportError::NotFound) => {
                debug!(wallet, "coordination service has no record of wallet");
                Ok(Vec::new())
            }
            Err(source) => Err(ConfirmationError::Lookup {
                wallet: wallet.to_string(),
                source,
            }),
        }
    }

    /// The proposal a signature over `payload` should be attached to.
    ///
    /// Prefers the proposal with the same destination and value. When the
    /// service reports no structured data for any proposal, the first listed
    /// one is used.
    pub async fn find_matching(
        &self,
        wallet: &str,
        payload: &TxPayload,
    ) -> Result<Option<PendingTransaction>, ConfirmationError> {
        let pending = self.list_pending(wallet).await?;

        if let Some(exact) = pending.iter().find(|p| p.matches(payload)) {
            return Ok(Some(exact.clone()));
        }
        if pending.iter().all(|p| p.proposal.is_none()) {
            return Ok(pending.into_iter().next());
        }
        Ok(None)
    }

    /// Submit `owner`'s confirmation of `tx_hash` and return the proposal as
    /// the service now holds it.
    ///
    /// A confirmation the service already has on record is not an error: the
    /// current proposal is read back instead.
    pub async fn confirm(
        &self,
        tx_hash: &str,
        owner: Address,
        signature: &[u8],
    ) -> Result<PendingTransaction, ConfirmationError> {
        let rejected = |source: TransportError| ConfirmationError::Rejected {
            tx_hash: tx_hash.to_string(),
            source,
        };
        match self.service.confirm(tx_hash, owner, signature).await {
            Ok(updated) => Ok(updated),
            Err(TransportError::AlreadyConfirmed(_)) => {
                debug!(tx_hash, "confirmation already on record");
                self.service.get(tx_hash).await.map_err(rejected)
            }
            Err(source) => Err(rejected(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryCoordinator;
    use crate::types::SafeTransactionData;
    use ethers::types::U256;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    fn proposal(to: u8, value: u64) -> SafeTransactionData {
        SafeTransactionData {
            to: Address::repeat_byte(to),
            value: U256::from(value),
            data: vec![],
            operation: 0,
            safe_tx_gas: U256::zero(),
            base_gas: U256::zero(),
            gas_price: U256::zero(),
            gas_token: Address::zero(),
            refund_receiver: Address::zero(),
            confirmations: vec![],
        }
    }

    #[tokio::test]
    async fn test_not_found_is_empty() {
        let tracker = PendingTransactionTracker::new(Arc::new(InMemoryCoordinator::new()));
        assert_eq!(tracker.list_pending(WALLET).await, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_other_transport_errors_propagate() {
        let coordinator = InMemoryCoordinator::new();
        coordinator
            .fail_list_with(TransportError::Status { code: 503, body: "down".into() })
            .await;
        let tracker = PendingTransactionTracker::new(Arc::new(coordinator));

        let err = tracker.list_pending(WALLET).await.unwrap_err();
        assert!(matches!(
            err,
            ConfirmationError::Lookup {
                source: TransportError::Status { code: 503, .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_find_matching_prefers_same_payload() {
        let coordinator = InMemoryCoordinator::new();
        coordinator.add_wallet(WALLET, 2).await;
        coordinator
            .propose(WALLET, PendingTransaction::new("0x01", 0, 2).with_proposal(proposal(0xaa, 5)))
            .await;
        coordinator
            .propose(WALLET, PendingTransaction::new("0x02", 0, 2).with_proposal(proposal(0xbb, 9)))
            .await;
        let tracker = PendingTransactionTracker::new(Arc::new(coordinator));

        let target = TxPayload { to: Address::repeat_byte(0xbb), value: U256::from(9u64) };
        let found = tracker.find_matching(WALLET, &target).await.unwrap().unwrap();
        assert_eq!(found.transaction_hash, "0x02");

        let unknown = TxPayload { to: Address::repeat_byte(0xcc), value: U256::from(9u64) };
        assert_eq!(tracker.find_matching(WALLET, &unknown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_matching_falls_back_to_first_unstructured() {
        let coordinator = InMemoryCoordinator::new();
        coordinator.add_wallet(WALLET, 2).await;
        coordinator.propose(WALLET, PendingTransaction::new("0x01", 0, 2)).await;
        coordinator.propose(WALLET, PendingTransaction::new("0x02", 0, 2)).await;
        let tracker = PendingTransactionTracker::new(Arc::new(coordinator));

        let payload = TxPayload { to: Address::repeat_byte(0xaa), value: U256::one() };
        let found = tracker.find_matching(WALLET, &payload).await.unwrap().unwrap();
        assert_eq!(found.transaction_hash, "0x01");
    }

    #[tokio::test]
    async fn test_confirm_rejection_is_confirmation_error() {
        let coordinator = InMemoryCoordinator::new();
        coordinator
            .fail_confirm_with(TransportError::Status {
                code: 400,
                body: "bad".into(),
            })
            .await;
        let tracker = PendingTransactionTracker::new(Arc::new(coordinator));

        let err = tracker
            .confirm("0x01", Address::repeat_byte(1), &[1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConfirmationError::Rejected { ref tx_hash, .. } if tx_hash == "0x01"
        ));
    }

    #[tokio::test]
    async fn test_repeat_confirmation_reads_back_proposal() {
        let coordinator = InMemoryCoordinator::new();
        coordinator.add_wallet(WALLET, 3).await;
        coordinator
            .propose(WALLET, PendingTransaction::new("0x01", 0, 3).with_proposal(proposal(0xaa, 5)))
            .await;
        let tracker = PendingTransactionTracker::new(Arc::new(coordinator));
        let owner = Address::repeat_byte(1);

        let first = tracker.confirm("0x01", owner, &[1]).await.unwrap();
        let second = tracker.confirm("0x01", owner, &[1]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.confirmations_count, 1);
        assert!(second.confirmed_by(owner));
    }
}
