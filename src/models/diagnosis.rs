use serde::{Deserialize, Serialize};

use super::enums::{FeedbackRating, ProcessingStatus, Severity};

/// Id prefix of records entered by an operator without AI analysis.
pub const MANUAL_ID_PREFIX: &str = "MAN-";

/// One fault report spanning intake, conclusion and post-repair follow-up.
///
/// Serialized with camelCase keys so persisted collections stay compatible
/// with the browser-side storage format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultDiagnosis {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub product_name: String,
    pub category: String,
    pub description: String,
    /// Canonical province name (see `region::normalize_to_province`).
    pub source_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Older records were written before status tracking existed.
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    /// Attached photo as a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub result: DiagnosisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl FaultDiagnosis {
    pub fn is_manual(&self) -> bool {
        self.id.starts_with(MANUAL_ID_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub fault_issue: String,
    /// In [0, 1].
    pub confidence: f64,
    pub severity: Severity,
    pub reasoning: String,
    pub suggested_actions: Vec<String>,
    /// Reserved; cost estimation is not implemented and this is always empty.
    #[serde(default)]
    pub estimated_repair_cost: String,
}

impl DiagnosisResult {
    /// Confidence as a rounded whole percentage (0.88 → 88).
    ///
    /// Out-of-range values are clamped; NaN counts as 0.
    pub fn confidence_percent(&self) -> u8 {
        if self.confidence.is_nan() {
            return 0;
        }
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: FeedbackRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
