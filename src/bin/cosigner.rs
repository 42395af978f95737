//! Co-signer CLI.
//!
//! Reads one classified transaction request as JSON and prints the decision.
//!
//! Usage:
//!   cosigner --request path/to/request.json
//!   cat request.json | cosigner
//!   cosigner --whoami
//!   cosigner --dry-run --oracle-answer "YES" --request request.json
//!
//! Configuration is read from the environment (see `CosignerConfig`). In
//! `--dry-run` mode the coordination service and executor are in-memory and
//! only `AGENT_PRIVATE_KEY` is required.

use std::env;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use safe_cosigner::adapters::{InMemoryCoordinator, ScriptedOracle};
use safe_cosigner::config::{credential_from_env, log_level};
use safe_cosigner::{
    CosignerConfig, CosignerError, DecisionEngine, DecisionOutcome, TransactionRequest,
};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Args {
    request: Option<String>,
    whoami: bool,
    dry_run: bool,
    oracle_answer: String,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        request: None,
        whoami: false,
        dry_run: false,
        oracle_answer: "NO - dry run".to_string(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--request" => {
                if i + 1 < args.len() {
                    parsed.request = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--oracle-answer" => {
                if i + 1 < args.len() {
                    parsed.oracle_answer = args[i + 1].clone();
                    i += 1;
                }
            }
            "--whoami" => parsed.whoami = true,
            "--dry-run" => parsed.dry_run = true,
            _ => {}
        }
        i += 1;
    }
    parsed
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn read_request(path: Option<&str>) -> Result<TransactionRequest, CosignerError> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CosignerError::InvalidRequest(format!("{}: {}", path, e)))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| CosignerError::InvalidRequest(e.to_string()))?;
            buf
        }
    };
    TransactionRequest::from_json(&raw)
}

fn build_engine(args: &Args) -> Result<DecisionEngine, CosignerError> {
    let credential = credential_from_env()?;
    if args.dry_run {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        return Ok(DecisionEngine::new(
            credential,
            Arc::new(ScriptedOracle::answering(args.oracle_answer.clone())),
            coordinator.clone(),
            coordinator,
        ));
    }
    let config = CosignerConfig::from_env()?;
    DecisionEngine::from_config(&config, credential)
}

fn response(outcome: &DecisionOutcome) -> serde_json::Value {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    json!({
        "status": if outcome.is_signed() { "signed" } else { "not signed" },
        "agent_reason": outcome.agent_reason,
        "signature": outcome.signature_hex(),
        "decision": outcome.decision,
        "receipt": outcome.receipt,
        "confirmed_transaction": outcome.confirmed_transaction,
        "timestamp": timestamp,
    })
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = parse_args();

    let engine = match build_engine(&args) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize co-signer: {}", e);
            std::process::exit(1);
        }
    };

    if args.whoami {
        match engine.signer_address() {
            Ok(address) => {
                let health = json!({ "status": "healthy", "signer": format!("{:?}", address) });
                println!("{}", health);
            }
            Err(e) => {
                error!("Failed to derive signer address: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let request = match read_request(args.request.as_deref()).await {
        Ok(request) => request,
        Err(e) => {
            println!("{}", json!({ "error": e.to_string() }));
            std::process::exit(2);
        }
    };

    info!(wallet = %request.wallet_address, status = %request.status, "request received");
    let outcome = engine.decide(&request).await;
    println!("{}", response(&outcome));
}
