pub mod llm;
pub mod parser;
pub mod processor;

pub use llm::{GeminiClient, LlmError, LlmOutcome};
pub use parser::{parse_claim_verdict, parse_paper_verdict};
pub use processor::FactVerifier;
