//! In-process collaborators.
//!
//! `InMemoryCoordinator` plays both the coordination service and the on-chain
//! executor; `ScriptedOracle` returns a canned answer. Both are used by the
//! test suites and by the `cosigner --dry-run` mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::Address;
use tokio::sync::Mutex;

use super::{CoordinationService, TransactionExecutor};
use crate::agents::ReasoningOracle;
use crate::error::{AdjudicationError, ExecutionError, TransportError};
use crate::types::{ExecutionReceipt, PendingTransaction};

#[derive(Default)]
struct WalletState {
    threshold: u32,
    pending: Vec<PendingTransaction>,
}

#[derive(Default)]
struct CoordinatorState {
    wallets: HashMap<String, WalletState>,
    confirmations: Vec<(String, Address, Vec<u8>)>,
    executions: Vec<String>,
    executed: Vec<PendingTransaction>,
    interleaved: Vec<(Address, Vec<u8>)>,
    list_failure: Option<TransportError>,
    confirm_failure: Option<TransportError>,
    execute_failure: Option<ExecutionError>,
    next_block: u64,
}

/// Coordination service and executor backed by process memory.
///
/// Wallet addresses are compared case-insensitively. Unknown wallets answer
/// `list` and `threshold` with [`TransportError::NotFound`].
#[derive(Default)]
pub struct InMemoryCoordinator {
    state: Mutex<CoordinatorState>,
}

impl InMemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `wallet` with a confirmation threshold.
    pub async fn add_wallet(&self, wallet: &str, threshold: u32) {
        let mut state = self.state.lock().await;
        state.wallets.entry(wallet.to_lowercase()).or_default().threshold = threshold;
    }

    /// Add a pending proposal to a registered wallet.
    pub async fn propose(&self, wallet: &str, pending: PendingTransaction) {
        let mut state = self.state.lock().await;
        state.wallets.entry(wallet.to_lowercase()).or_default().pending.push(pending);
    }

    pub async fn fail_list_with(&self, err: TransportError) {
        self.state.lock().await.list_failure = Some(err);
    }

    pub async fn fail_confirm_with(&self, err: TransportError) {
        self.state.lock().await.confirm_failure = Some(err);
    }

    pub async fn fail_execute_with(&self, err: ExecutionError) {
        self.state.lock().await.execute_failure = Some(err);
    }

    /// Have another owner's confirmation land on the proposal just before the
    /// next `confirm` call is applied.
    pub async fn interleave_confirmation(&self, owner: Address, signature: Vec<u8>) {
        self.state.lock().await.interleaved.push((owner, signature));
    }

    /// Every confirmation accepted so far, as `(tx_hash, owner, signature)`.
    pub async fn confirmations(&self) -> Vec<(String, Address, Vec<u8>)> {
        self.state.lock().await.confirmations.clone()
    }

    /// Hashes of every executed proposal, in order.
    pub async fn executions(&self) -> Vec<String> {
        self.state.lock().await.executions.clone()
    }

    /// Proposals exactly as they were handed to `execute`.
    pub async fn executed_transactions(&self) -> Vec<PendingTransaction> {
        self.state.lock().await.executed.clone()
    }

    pub async fn pending(&self, wallet: &str) -> Vec<PendingTransaction> {
        self.state
            .lock()
            .await
            .wallets
            .get(&wallet.to_lowercase())
            .map(|w| w.pending.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CoordinationService for InMemoryCoordinator {
    async fn list(&self, wallet: &str) -> Result<Vec<PendingTransaction>, TransportError> {
        let state = self.state.lock().await;
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }
        state
            .wallets
            .get(&wallet.to_lowercase())
            .map(|w| w.pending.clone())
            .ok_or(TransportError::NotFound)
    }

    async fn get(&self, tx_hash: &str) -> Result<PendingTransaction, TransportError> {
        let state = self.state.lock().await;
        state
            .wallets
            .values()
            .flat_map(|w| w.pending.iter())
            .find(|p| p.transaction_hash == tx_hash)
            .cloned()
            .ok_or(TransportError::NotFound)
    }

    async fn confirm(
        &self,
        tx_hash: &str,
        owner: Address,
        signature: &[u8],
    ) -> Result<PendingTransaction, TransportError> {
        let mut state = self.state.lock().await;
        if let Some(err) = &state.confirm_failure {
            return Err(err.clone());
        }
        let duplicate = state
            .confirmations
            .iter()
            .any(|(hash, by, _)| hash == tx_hash && *by == owner);
        if duplicate {
            return Err(TransportError::AlreadyConfirmed(tx_hash.to_string()));
        }

        let interleaved = std::mem::take(&mut state.interleaved);
        let pending = state
            .wallets
            .values_mut()
            .flat_map(|w| w.pending.iter_mut())
            .find(|p| p.transaction_hash == tx_hash)
            .ok_or(TransportError::NotFound)?;
        for (other, other_sig) in &interleaved {
            pending.record_confirmation(*other, other_sig.clone());
        }
        pending.record_confirmation(owner, signature.to_vec());
        let updated = pending.clone();

        for (other, other_sig) in interleaved {
            state.confirmations.push((tx_hash.to_string(), other, other_sig));
        }
        state
            .confirmations
            .push((tx_hash.to_string(), owner, signature.to_vec()));
        Ok(updated)
    }

    async fn threshold(&self, wallet: &str) -> Result<u32, TransportError> {
        self.state
            .lock()
            .await
            .wallets
            .get(&wallet.to_lowercase())
            .map(|w| w.threshold)
            .ok_or(TransportError::NotFound)
    }
}

#[async_trait]
impl TransactionExecutor for InMemoryCoordinator {
    async fn execute(
        &self,
        wallet: &str,
        pending: &PendingTransaction,
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let mut state = self.state.lock().await;
        if let Some(err) = &state.execute_failure {
            return Err(err.clone());
        }

        let entry = state
            .wallets
            .get_mut(&wallet.to_lowercase())
            .ok_or_else(|| ExecutionError::NotExecutable {
                tx_hash: pending.transaction_hash.clone(),
                reason: format!("unknown wallet {}", wallet),
            })?;
        let before = entry.pending.len();
        entry.pending.retain(|p| p.transaction_hash != pending.transaction_hash);
        if entry.pending.len() == before {
            return Err(ExecutionError::NotExecutable {
                tx_hash: pending.transaction_hash.clone(),
                reason: "not pending".into(),
            });
        }

        state.next_block += 1;
        let block_number = state.next_block;
        state.executions.push(pending.transaction_hash.clone());
        state.executed.push(pending.clone());

        Ok(ExecutionReceipt {
            transaction_hash: format!("exec:{}", pending.transaction_hash),
            block_number: Some(block_number),
        })
    }
}

/// A reasoning oracle with a fixed answer.
pub struct ScriptedOracle {
    answer: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            answer: Ok(answer.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An oracle whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn complete(&self, _prompt: &str) -> Result<String, AdjudicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone().map_err(AdjudicationError::Oracle)
    }
}
