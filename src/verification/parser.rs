//! Free-text verdict parsing.
//!
//! The generative API is asked for a line-oriented format ("Truth Score:",
//! "Explanation:", "Sources:") but real responses drift: labels change
//! case, fields go missing, sources come back as prose. Parsing is
//! pattern-based and every field has a defined fallback so the handler
//! always gets a complete result.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ClaimResult, PaperEvaluation, ScorePercent, TruthScore};

static TRUTH_SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^truth score:\s*(\d+)").unwrap());

static EXPLANATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ims)^explanation:\s*(.*?)(?:^\s*sources:|\z)").unwrap());

static SOURCES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?ims)^sources:\s*(.*)").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s,"'<>]+"#).unwrap());

static SCORE_PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^score percent:\s*(\d{1,3})\s*%?").unwrap());

static JUSTIFICATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ims)^justification:\s*(.*)").unwrap());

const DEFAULT_EXPLANATION: &str = "Could not parse explanation from AI response.";
const DEFAULT_JUSTIFICATION: &str = "Could not parse justification from AI response.";
const TRUNCATION_NOTE: &str =
    "\n\n(Note: This evaluation was based on truncated text due to length limitations.)";

/// Extracts a claim verdict from free text. Missing score defaults to 50
/// (uncertain); out-of-range scores are clamped.
pub fn parse_claim_verdict(text: &str) -> ClaimResult {
    let text = text.trim();

    let truth_score = TRUTH_SCORE_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(TruthScore::from_value)
        .unwrap_or(TruthScore::Score(50));

    let explanation = EXPLANATION_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|explanation| !explanation.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string());

    let sources = SOURCES_RE
        .captures(text)
        .map(|caps| extract_source_urls(caps[1].trim()))
        .unwrap_or_default();

    ClaimResult {
        truth_score,
        explanation,
        sources,
    }
}

/// Harvests URLs from the sources line. A line of "None"/"N/A" (or prose
/// without URLs) yields nothing.
fn extract_source_urls(sources_line: &str) -> Vec<String> {
    if matches!(sources_line.to_lowercase().as_str(), "none" | "n/a" | "") {
        return Vec::new();
    }

    URL_RE
        .find_iter(sources_line)
        .map(|url| url.as_str().trim_end_matches(['.', ',']).to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

/// Extracts a paper evaluation from free text. `truncated` records whether
/// the input was cut before prompting; when the model does not already
/// mention it, the justification is annotated.
pub fn parse_paper_verdict(text: &str, truncated: bool) -> PaperEvaluation {
    let text = text.trim();

    let score_percent = SCORE_PERCENT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(ScorePercent::from_value)
        .unwrap_or(ScorePercent::NotAvailable);

    let mut justification = JUSTIFICATION_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|justification| !justification.is_empty())
        .unwrap_or_else(|| DEFAULT_JUSTIFICATION.to_string());

    if truncated
        && !justification.contains("[Text Truncated]")
        && !justification.to_lowercase().contains("truncated text")
    {
        justification.push_str(TRUNCATION_NOTE);
    }

    PaperEvaluation {
        score_percent,
        justification,
        truncated,
    }
}
