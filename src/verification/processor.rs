use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ClaimResult, PaperEvaluation, ScorePercent, TruthScore};
use crate::verification::llm::{GeminiClient, LlmError, LlmOutcome};
use crate::verification::parser::{parse_claim_verdict, parse_paper_verdict};

// Low temperatures keep the line-oriented output format stable enough to
// parse. Claims tolerate slightly more variation than paper reviews.
const CLAIM_TEMPERATURE: f32 = 0.2;
const EVALUATION_TEMPERATURE: f32 = 0.1;

pub struct FactVerifier {
    client: GeminiClient,
    max_paper_chars: usize,
}

impl FactVerifier {
    pub fn new(client: GeminiClient, config: &Config) -> Self {
        Self {
            client,
            max_paper_chars: config.max_paper_chars,
        }
    }

    /// Verifies a text claim. Never fails: API errors, safety blocks, and
    /// unusable responses all map onto a `ClaimResult` the client can
    /// render.
    pub async fn verify_claim(&self, claim: &str) -> ClaimResult {
        debug!("Verifying claim: {}", claim);

        let prompt = claim_prompt(claim);

        match self.client.generate(&prompt, CLAIM_TEMPERATURE).await {
            Ok(LlmOutcome::Text(text)) => parse_claim_verdict(&text),
            Ok(LlmOutcome::Blocked { reason }) => {
                info!("Claim prompt blocked. Reason: {}", reason);
                ClaimResult {
                    truth_score: TruthScore::Blocked,
                    explanation: format!("Content blocked by safety filter ({reason})"),
                    sources: Vec::new(),
                }
            }
            Ok(LlmOutcome::NoCandidates) => ClaimResult {
                truth_score: TruthScore::NotAvailable,
                explanation: "No valid response generated by the AI model.".to_string(),
                sources: Vec::new(),
            },
            Ok(LlmOutcome::EmptyText) => ClaimResult {
                truth_score: TruthScore::NotAvailable,
                explanation: "Empty response text from the AI model.".to_string(),
                sources: Vec::new(),
            },
            Err(e) => {
                warn!("Gemini API call failed in verify_claim: {}", e);
                ClaimResult {
                    truth_score: TruthScore::Error,
                    explanation: format!("An API error occurred: {}", error_details(&e)),
                    sources: Vec::new(),
                }
            }
        }
    }

    /// Evaluates research-paper text, truncating long inputs to the
    /// configured character limit before prompting.
    pub async fn evaluate_paper(&self, text: &str) -> PaperEvaluation {
        let (text_to_process, truncated) = truncate_chars(text, self.max_paper_chars);

        if truncated {
            warn!(
                "Paper text exceeds {} chars, truncating for evaluation",
                self.max_paper_chars
            );
        }

        let prompt = paper_prompt(text_to_process, truncated);

        match self.client.generate(&prompt, EVALUATION_TEMPERATURE).await {
            Ok(LlmOutcome::Text(response)) => parse_paper_verdict(&response, truncated),
            Ok(LlmOutcome::Blocked { reason }) => {
                info!("Evaluation prompt blocked. Reason: {}", reason);
                PaperEvaluation {
                    score_percent: ScorePercent::Blocked,
                    justification: format!("Content blocked by safety filter ({reason})"),
                    truncated,
                }
            }
            Ok(LlmOutcome::NoCandidates) => PaperEvaluation {
                score_percent: ScorePercent::NotAvailable,
                justification: "No valid response generated by the AI model for evaluation."
                    .to_string(),
                truncated,
            },
            Ok(LlmOutcome::EmptyText) => PaperEvaluation {
                score_percent: ScorePercent::NotAvailable,
                justification: "Empty response text from the AI model for evaluation."
                    .to_string(),
                truncated,
            },
            Err(e) => {
                warn!("Gemini API call failed in evaluate_paper: {}", e);
                PaperEvaluation {
                    score_percent: ScorePercent::Error,
                    justification: format!(
                        "An API error occurred during paper evaluation: {}",
                        error_details(&e)
                    ),
                    truncated,
                }
            }
        }
    }
}

/// Client-facing error strings carry the underlying cause, not the retry
/// bookkeeping.
fn error_details(error: &LlmError) -> String {
    match error {
        LlmError::MaxRetriesExceeded(details) => details.clone(),
        other => other.to_string(),
    }
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

fn claim_prompt(claim: &str) -> String {
    format!(
        "Analyze the following claim and determine if it is true, false, or uncertain \
         based on current, verifiable knowledge up to your last update.\n\
         Claim: \"{claim}\"\n\n\
         Format your response strictly as follows, with each item on a new line:\n\
         Truth Score: [Provide a numerical score from 0 (Definitely False) to 100 \
         (Definitely True). Use 50 for Uncertain/Cannot Verify/Opinion.]\n\
         Explanation: [Provide a concise explanation for the score, mentioning key \
         evidence or lack thereof. State if it's opinion-based.]\n\
         Sources: [List up to 2 relevant, highly credible source URLs (like primary \
         sources or reputable encyclopedias) if verifiable and applicable. If none, \
         write \"None\".]"
    )
}

fn paper_prompt(text: &str, truncated: bool) -> String {
    let truncation_note = if truncated {
        " Note: Evaluation based on truncated text."
    } else {
        ""
    };

    format!(
        "Act as an impartial academic reviewer. Evaluate the quality of the following \
         research paper text based *only* on the provided text and these criteria:\n\
         1. Clarity of Research Question/Purpose: Is the main goal clearly stated and \
         understandable?\n\
         2. Soundness of Methodology: Are the methods described adequately and \
         appropriate for the question?\n\
         3. Significance & Validity of Findings/Conclusions: Are results clearly \
         presented? Do they address the question? Are conclusions justified by the \
         results? Is the significance discussed?\n\
         4. Overall Structure & Clarity of Writing: Is the paper well-organized, \
         logical, and easy to read?\n\n\
         Provide your response STRICTLY in the following format:\n\n\
         Score Percent: [Assign an overall quality score percentage from 0% to 100% \
         based on the criteria. Be consistent.]\n\
         Justification: [Provide a detailed justification explaining the score. \
         Clearly separate strengths and weaknesses. Start with 'Strengths:' list \
         positive aspects related to the criteria. Then start with 'Weaknesses:' list \
         negative aspects or limitations related to the criteria. Explain how these \
         factors combine to justify the specific percentage score assigned.]{truncation_note}\n\n\
         --- START RESEARCH PAPER TEXT ---\n\
         {text}\n\
         --- END RESEARCH PAPER TEXT ---"
    )
}
