use crate::error::AppError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Text shown when the service did not propose a correction.
pub const NO_CORRECTION: &str = "No correction proposed.";

/// A request to analyze a piece of selected text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnalysisRequest {
    /// The selected text, already trimmed.
    #[validate(length(min = 1))]
    pub text: String,
}

impl AnalysisRequest {
    /// Trims `raw` and rejects blank selections.
    pub fn new(raw: &str) -> Result<Self, AppError> {
        let request = Self {
            text: raw.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

/// The structured outcome of a detection call.
///
/// Deserializes from the flat service contract as well as from the
/// `{ "ai_analysis": { ... } }` envelope; always serializes flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ServiceResponse")]
pub struct AnalysisResult {
    pub is_correct: bool,
    /// Between 0 and 1.
    pub confidence: f64,
    pub corrected_version: String,
    pub explanation: String,
}

impl AnalysisResult {
    pub fn new(is_correct: bool, confidence: f64, corrected_version: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            is_correct,
            confidence: clamp_confidence(confidence),
            corrected_version: corrected_version.into(),
            explanation: explanation.into(),
        }
    }

    /// Confidence as a rounded percentage (`0.92` -> `92`).
    pub fn confidence_percent(&self) -> u8 {
        (clamp_confidence(self.confidence) * 100.0).round() as u8
    }

    pub fn verdict(&self) -> Verdict {
        let percent = self.confidence_percent();
        if !self.is_correct || percent < 50 {
            Verdict::Hallucination
        } else if percent < 85 {
            Verdict::Doubtful
        } else {
            Verdict::Verified
        }
    }

    pub fn theme(&self) -> ResultTheme {
        match self.verdict() {
            Verdict::Verified => ResultTheme::Success,
            Verdict::Doubtful | Verdict::Hallucination => ResultTheme::Warning,
        }
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// How the service judged the analyzed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Doubtful,
    Hallucination,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Verified => "Verified",
            Verdict::Doubtful => "Doubtful",
            Verdict::Hallucination => "Hallucination",
        }
    }
}

/// Visual treatment of a result modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTheme {
    Success,
    Warning,
}

impl ResultTheme {
    pub fn css_class(&self) -> &'static str {
        match self {
            ResultTheme::Success => "hd-theme-success",
            ResultTheme::Warning => "hd-theme-warning",
        }
    }
}

/// Both response shapes the detection backend is known to produce.
#[derive(Deserialize)]
#[serde(untagged)]
enum ServiceResponse {
    Envelope { ai_analysis: EnvelopeAnalysis },
    Flat(FlatAnalysis),
}

#[derive(Deserialize)]
struct EnvelopeAnalysis {
    #[serde(default)]
    is_hallucination: bool,
    #[serde(default)]
    confidence_score: Option<f64>,
    #[serde(default)]
    corrected_text: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Deserialize)]
struct FlatAnalysis {
    is_correct: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    corrected_version: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

impl From<ServiceResponse> for AnalysisResult {
    fn from(raw: ServiceResponse) -> Self {
        match raw {
            ServiceResponse::Envelope { ai_analysis } => AnalysisResult::new(
                !ai_analysis.is_hallucination,
                ai_analysis.confidence_score.unwrap_or(0.0),
                non_empty_or(ai_analysis.corrected_text, NO_CORRECTION),
                ai_analysis.explanation.unwrap_or_default(),
            ),
            ServiceResponse::Flat(flat) => AnalysisResult::new(
                flat.is_correct,
                flat.confidence.unwrap_or(0.0),
                non_empty_or(flat.corrected_version, NO_CORRECTION),
                flat.explanation.unwrap_or_default(),
            ),
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}
