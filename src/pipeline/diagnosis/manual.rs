use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::orchestrator::{require_fields, trimmed_or_none};
use super::types::ImageData;
use super::DiagnosisError;
use crate::models::{
    DiagnosisResult, FaultDiagnosis, ProcessingStatus, Severity, MANUAL_ID_PREFIX,
};
use crate::region::normalize_to_province;

pub const UNLABELED_ISSUE: &str = "未标注问题";
pub const MANUAL_REASONING: &str = "此记录为人工手动录入，未经 AI 分析。";
pub const DEFAULT_MANUAL_ACTION: &str = "按标准售后流程处理";

/// A case recorded by an operator who already knows the outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub product_name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub source_region: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Operator's conclusion; also becomes the verified actual result.
    #[serde(default)]
    pub manual_issue: String,
    #[serde(default)]
    pub manual_solution: String,
    #[serde(default)]
    pub image: Option<ImageData>,
}

/// Build a processed record without calling the analysis service.
pub fn build_manual_diagnosis(entry: &ManualEntry) -> Result<FaultDiagnosis, DiagnosisError> {
    let (product_name, description) = require_fields(&entry.product_name, &entry.description)?;

    let issue = entry.manual_issue.trim();
    let solution = entry.manual_solution.trim();

    let result = DiagnosisResult {
        fault_issue: if issue.is_empty() {
            UNLABELED_ISSUE.to_string()
        } else {
            issue.to_string()
        },
        confidence: 1.0,
        severity: Severity::Medium,
        reasoning: MANUAL_REASONING.to_string(),
        suggested_actions: vec![if solution.is_empty() {
            DEFAULT_MANUAL_ACTION.to_string()
        } else {
            solution.to_string()
        }],
        estimated_repair_cost: String::new(),
    };

    let diagnosis = FaultDiagnosis {
        id: manual_id(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        product_name: product_name.to_string(),
        category: entry.category.trim().to_string(),
        description: description.to_string(),
        source_region: normalize_to_province(&entry.source_region).to_string(),
        remark: trimmed_or_none(entry.remark.as_deref()),
        status: ProcessingStatus::Processed,
        tracking_number: trimmed_or_none(entry.tracking_number.as_deref()),
        image_url: entry.image.as_ref().map(ImageData::to_data_url),
        result,
        actual_result: trimmed_or_none(Some(issue)),
        feedback: None,
    };

    tracing::info!(
        id = %diagnosis.id,
        product = %diagnosis.product_name,
        region = %diagnosis.source_region,
        "Manual diagnosis recorded"
    );
    Ok(diagnosis)
}

/// `MAN-` followed by six uppercase alphanumerics.
fn manual_id() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("{MANUAL_ID_PREFIX}{suffix}")
}
