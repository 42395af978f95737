//! Reasoning-oracle adjudication for `warning` requests.

pub mod adjudicator;
pub mod oracle;

pub use adjudicator::{build_prompt, extract_verdict, ReasoningAdjudicator, POSITIVE_INDICATORS};
pub use oracle::{OpenAiOracle, ReasoningOracle};
