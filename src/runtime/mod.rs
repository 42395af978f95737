//! Decision pipeline: tracker, threshold aggregator and the engine composing them.

pub mod engine;
pub mod threshold;
pub mod tracker;

pub use engine::{DecisionEngine, MissingProposalPolicy};
pub use threshold::ThresholdExecutor;
pub use tracker::PendingTransactionTracker;
