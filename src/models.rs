use serde::{Serialize, Serializer};

/// Verdict score for a claim. The browser client expects a string in all
/// cases, including the numeric one ("0" through "100").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruthScore {
    Score(u8),
    NotAvailable,
    Error,
    Blocked,
}

impl TruthScore {
    /// Clamps out-of-range model output into the 0-100 band.
    pub fn from_value(value: u32) -> Self {
        TruthScore::Score(value.min(100) as u8)
    }
}

impl Serialize for TruthScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TruthScore::Score(value) => serializer.serialize_str(&value.to_string()),
            TruthScore::NotAvailable => serializer.serialize_str("N/A"),
            TruthScore::Error => serializer.serialize_str("Error"),
            TruthScore::Blocked => serializer.serialize_str("Blocked"),
        }
    }
}

/// Quality score for a paper evaluation. Serializes as a JSON integer when
/// numeric and as a status string otherwise, matching what the client
/// already renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScorePercent {
    Percent(u8),
    NotAvailable,
    Error,
    Blocked,
}

impl ScorePercent {
    pub fn from_value(value: u32) -> Self {
        ScorePercent::Percent(value.min(100) as u8)
    }
}

impl Serialize for ScorePercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScorePercent::Percent(value) => serializer.serialize_u8(*value),
            ScorePercent::NotAvailable => serializer.serialize_str("N/A"),
            ScorePercent::Error => serializer.serialize_str("Error"),
            ScorePercent::Blocked => serializer.serialize_str("Blocked"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResult {
    pub truth_score: TruthScore,
    pub explanation: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaperEvaluation {
    pub score_percent: ScorePercent,
    pub justification: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepfakeResult {
    pub real_score: f64,
    pub fake_score: f64,
}

#[derive(Debug, Serialize)]
pub struct FactCheckResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,

    #[serde(flatten)]
    pub result: ClaimResult,
}

impl FactCheckResponse {
    pub fn new(result: ClaimResult) -> Self {
        Self {
            kind: "fact_check",
            result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeepfakeResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,

    #[serde(flatten)]
    pub result: DeepfakeResult,
}

impl DeepfakeResponse {
    pub fn new(result: DeepfakeResult) -> Self {
        Self {
            kind: "deepfake_detection",
            result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,

    pub preview: String,

    #[serde(flatten)]
    pub result: PaperEvaluation,
}

impl EvaluationResponse {
    pub fn new(preview: String, result: PaperEvaluation) -> Self {
        Self {
            kind: "evaluation",
            preview,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_score_serializes_as_string() {
        let result = ClaimResult {
            truth_score: TruthScore::Score(85),
            explanation: "well documented".to_string(),
            sources: vec!["https://example.org".to_string()],
        };

        let json = serde_json::to_value(FactCheckResponse::new(result)).unwrap();
        assert_eq!(json["type"], "fact_check");
        assert_eq!(json["truth_score"], "85");
        assert_eq!(json["sources"][0], "https://example.org");
    }

    #[test]
    fn test_truth_score_status_variants() {
        assert_eq!(
            serde_json::to_value(TruthScore::NotAvailable).unwrap(),
            "N/A"
        );
        assert_eq!(serde_json::to_value(TruthScore::Error).unwrap(), "Error");
        assert_eq!(
            serde_json::to_value(TruthScore::Blocked).unwrap(),
            "Blocked"
        );
    }

    #[test]
    fn test_truth_score_clamps_to_100() {
        assert_eq!(TruthScore::from_value(250), TruthScore::Score(100));
        assert_eq!(TruthScore::from_value(42), TruthScore::Score(42));
    }

    #[test]
    fn test_score_percent_numeric_stays_numeric() {
        let evaluation = PaperEvaluation {
            score_percent: ScorePercent::Percent(72),
            justification: "Strengths: clear question.".to_string(),
            truncated: false,
        };

        let json = serde_json::to_value(EvaluationResponse::new("abstract".into(), evaluation))
            .unwrap();
        assert_eq!(json["type"], "evaluation");
        assert_eq!(json["preview"], "abstract");
        assert_eq!(json["score_percent"], 72);
        assert_eq!(json["truncated"], false);
    }

    #[test]
    fn test_score_percent_status_is_string() {
        assert_eq!(
            serde_json::to_value(ScorePercent::NotAvailable).unwrap(),
            "N/A"
        );
        assert_eq!(serde_json::to_value(ScorePercent::Percent(0)).unwrap(), 0);
    }

    #[test]
    fn test_deepfake_response_shape() {
        let json = serde_json::to_value(DeepfakeResponse::new(DeepfakeResult {
            real_score: 73.21,
            fake_score: 26.79,
        }))
        .unwrap();

        assert_eq!(json["type"], "deepfake_detection");
        assert_eq!(json["real_score"], 73.21);
        assert_eq!(json["fake_score"], 26.79);
    }
}
