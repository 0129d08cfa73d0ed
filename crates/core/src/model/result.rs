use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::AssessmentId;

/// Per-skill breakdown inside an assessment result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub skill: String,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub cefr_level: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Finalized scoring payload for a completed assessment.
///
/// The controller treats this as opaque: it is produced by the external
/// scoring service (CEFR banding, IRT ability estimate, Lexile mapping) and
/// carried through unchanged for presentation. Fields the service may omit
/// are defaulted rather than failing the whole deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    #[serde(default)]
    pub assessment_id: Option<AssessmentId>,
    pub cefr_level: String,
    #[serde(default)]
    pub raw_score: f64,
    #[serde(default)]
    pub theta_score: f64,
    #[serde(default)]
    pub standard_error: f64,
    #[serde(default)]
    pub ket_readiness: f64,
    #[serde(default)]
    pub pet_readiness: f64,
    #[serde(default)]
    pub fce_readiness: f64,
    #[serde(default)]
    pub sub_scores: Vec<SubScore>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub lexile_estimate: Option<i32>,
    #[serde(default)]
    pub lexile_ci_low: Option<i32>,
    #[serde(default)]
    pub lexile_ci_high: Option<i32>,
    #[serde(default)]
    pub recommended_range_low: Option<i32>,
    #[serde(default)]
    pub recommended_range_high: Option<i32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}
