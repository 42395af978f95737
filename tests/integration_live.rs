#![cfg(feature = "live")]

//! Read-only checks against a real Safe Transaction Service.
//!
//! Set `SAFE_SERVICE_URL` (defaults to mainnet) and `LIVE_SAFE_ADDRESS` to a
//! deployed Safe. Nothing here confirms or executes.

use std::env;

use safe_cosigner::adapters::safe_service::DEFAULT_SAFE_SERVICE_URL;
use safe_cosigner::adapters::{CoordinationService, SafeTransactionService};
use safe_cosigner::error::TransportError;

fn service() -> SafeTransactionService {
    let url = env::var("SAFE_SERVICE_URL").unwrap_or_else(|_| DEFAULT_SAFE_SERVICE_URL.to_string());
    SafeTransactionService::new(url)
}

#[tokio::test]
async fn test_live_threshold_and_listing() {
    let Ok(wallet) = env::var("LIVE_SAFE_ADDRESS") else {
        eprintln!("LIVE_SAFE_ADDRESS not set; skipping");
        return;
    };
    let service = service();

    let threshold = service.threshold(&wallet).await.unwrap();
    assert!(threshold >= 1);

    let pending = service.list(&wallet).await.unwrap();
    for tx in &pending {
        assert!(tx.transaction_hash.starts_with("0x"));
    }
    let nonces: Vec<_> = pending.iter().filter_map(|p| p.nonce).collect();
    assert!(nonces.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_live_unknown_wallet_is_not_found() {
    let service = service();
    match service.list("0x000000000000000000000000000000000000dEaD").await {
        Err(TransportError::NotFound) => {}
        Ok(pending) => assert!(pending.is_empty()),
        Err(other) => panic!("unexpected error: {}", other),
    }
}
