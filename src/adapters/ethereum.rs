//! On-chain execution of confirmed Safe proposals.
//!
//! Uses `ethers-rs` to ABI-encode `execTransaction` with the owner-sorted
//! confirmation signatures and submit it from the co-signer's own account.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest as EthTransactionRequest, U256, U64};
use ethers::utils::id;
use tracing::{info, warn};

use super::TransactionExecutor;
use crate::error::{ExecutionError, SigningError};
use crate::hsm::Credential;
use crate::types::{ExecutionReceipt, PendingTransaction, ProposalConfirmation, SafeTransactionData};

const EXEC_TRANSACTION: &str =
    "execTransaction(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,bytes)";

/// Concatenate confirmation signatures in ascending owner order, as the Safe
/// contract requires.
pub fn pack_signatures(confirmations: &[ProposalConfirmation]) -> Vec<u8> {
    let mut sorted: Vec<&ProposalConfirmation> = confirmations.iter().collect();
    sorted.sort_by_key(|c| c.owner);
    sorted.iter().flat_map(|c| c.signature.iter().copied()).collect()
}

/// Calldata for `execTransaction` on the Safe holding `proposal`.
pub fn encode_exec_transaction(proposal: &SafeTransactionData) -> Vec<u8> {
    let mut calldata = id(EXEC_TRANSACTION).to_vec();
    calldata.extend(encode(&[
        Token::Address(proposal.to),
        Token::Uint(proposal.value),
        Token::Bytes(proposal.data.clone()),
        Token::Uint(U256::from(proposal.operation)),
        Token::Uint(proposal.safe_tx_gas),
        Token::Uint(proposal.base_gas),
        Token::Uint(proposal.gas_price),
        Token::Address(proposal.gas_token),
        Token::Address(proposal.refund_receiver),
        Token::Bytes(pack_signatures(&proposal.confirmations)),
    ]));
    calldata
}

/// Executes Safe proposals through a JSON-RPC node.
pub struct EthereumExecutor {
    client: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
}

impl EthereumExecutor {
    pub fn new(
        rpc_url: &str,
        credential: &Credential,
        chain_id: u64,
    ) -> Result<Self, SigningError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| SigningError::Signer(format!("invalid RPC URL: {}", e)))?;
        let wallet = credential.wallet()?.with_chain_id(chain_id);
        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        })
    }

    pub fn sender(&self) -> Address {
        self.client.signer().address()
    }
}

#[async_trait]
impl TransactionExecutor for EthereumExecutor {
    async fn execute(
        &self,
        wallet: &str,
        pending: &PendingTransaction,
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let tx_hash = pending.transaction_hash.clone();
        let proposal = pending.proposal.as_ref().ok_or_else(|| ExecutionError::NotExecutable {
            tx_hash: tx_hash.clone(),
            reason: "coordination service returned no transaction data".into(),
        })?;
        let safe: Address = wallet.parse().map_err(|e| ExecutionError::NotExecutable {
            tx_hash: tx_hash.clone(),
            reason: format!("invalid wallet address: {}", e),
        })?;

        let tx = EthTransactionRequest::new()
            .to(safe)
            .from(self.sender())
            .value(U256::zero())
            .data(Bytes::from(encode_exec_transaction(proposal)));

        info!(wallet, %tx_hash, "submitting execTransaction");
        let submitted = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ExecutionError::Submission(e.to_string()))?;

        let receipt = submitted
            .await
            .map_err(|e| ExecutionError::Submission(format!("finalization failed: {}", e)))?
            .ok_or_else(|| ExecutionError::Dropped(tx_hash.clone()))?;

        let chain_hash = format!("{:?}", receipt.transaction_hash);
        if receipt.status == Some(U64::zero()) {
            warn!(wallet, %tx_hash, %chain_hash, "execTransaction reverted");
            return Err(ExecutionError::Reverted(chain_hash));
        }

        Ok(ExecutionReceipt {
            transaction_hash: chain_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(owner_byte: u8, sig_byte: u8) -> ProposalConfirmation {
        ProposalConfirmation {
            owner: Address::repeat_byte(owner_byte),
            signature: vec![sig_byte; 65],
        }
    }

    #[test]
    fn test_signatures_sorted_by_owner() {
        let packed = pack_signatures(&[
            confirmation(0x33, 3),
            confirmation(0x11, 1),
            confirmation(0x22, 2),
        ]);
        assert_eq!(packed.len(), 195);
        assert_eq!(packed[0], 1);
        assert_eq!(packed[65], 2);
        assert_eq!(packed[130], 3);
    }

    #[test]
    fn test_exec_calldata_selector() {
        let proposal = SafeTransactionData {
            to: Address::repeat_byte(0xaa),
            value: U256::from(1_000_000u64),
            data: vec![],
            operation: 0,
            safe_tx_gas: U256::zero(),
            base_gas: U256::zero(),
            gas_price: U256::zero(),
            gas_token: Address::zero(),
            refund_receiver: Address::zero(),
            confirmations: vec![confirmation(0x11, 1)],
        };
        let calldata = encode_exec_transaction(&proposal);
        // execTransaction selector
        assert_eq!(&calldata[..4], &[0x6a, 0x76, 0x12, 0x02]);
        assert_eq!((calldata.len() - 4) % 32, 0);
    }

    #[test]
    fn test_executor_rejects_bad_rpc_url() {
        let key = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let credential = Credential::from_hex(key).unwrap();
        assert!(EthereumExecutor::new("not a url", &credential, 1).is_err());
        let executor = EthereumExecutor::new("http://localhost:8545", &credential, 1).unwrap();
        assert_eq!(executor.sender(), credential.address().unwrap());
    }
}
