use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{DiagnosisError, DEFAULT_INSUFFICIENT_REASON};
use crate::models::{DiagnosisResult, Severity};

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*(.*?)\s*```$").unwrap());

/// Reply shape declared by `analysis_response_schema`.
///
/// Everything is optional at this layer; which fields are required depends on
/// `isInformationValid`. Unknown keys (including any `estimatedRepairCost`) are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysisReply {
    is_information_valid: Option<bool>,
    invalid_reason: Option<String>,
    fault_issue: Option<String>,
    confidence: Option<f64>,
    severity: Option<String>,
    reasoning: Option<String>,
    suggested_actions: Option<Vec<String>>,
}

/// Validate the service's raw reply into a `DiagnosisResult`.
///
/// All-or-nothing: either every result field is present and well-formed, or
/// a single error is returned. `estimated_repair_cost` is always empty.
pub fn parse_analysis_reply(raw: Option<&str>) -> Result<DiagnosisResult, DiagnosisError> {
    let text = raw
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DiagnosisError::EmptyResponse)?;

    let json_str = unwrap_code_fence(text);

    let reply: RawAnalysisReply = serde_json::from_str(json_str)
        .map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))?;

    if !reply.is_information_valid.unwrap_or(false) {
        let reason = reply
            .invalid_reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_INSUFFICIENT_REASON.to_string());
        return Err(DiagnosisError::InsufficientInput(reason));
    }

    let fault_issue = required(reply.fault_issue, "faultIssue")?;
    if fault_issue.trim().is_empty() {
        return Err(DiagnosisError::MalformedResponse("empty field `faultIssue`".into()));
    }

    let confidence = required(reply.confidence, "confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(DiagnosisError::MalformedResponse(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }

    let severity_label = required(reply.severity, "severity")?;
    let severity = Severity::from_str(severity_label.trim())
        .map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))?;

    Ok(DiagnosisResult {
        fault_issue,
        confidence,
        severity,
        reasoning: required(reply.reasoning, "reasoning")?,
        suggested_actions: required(reply.suggested_actions, "suggestedActions")?,
        estimated_repair_cost: String::new(),
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, DiagnosisError> {
    value.ok_or_else(|| DiagnosisError::MalformedResponse(format!("missing field `{field}`")))
}

/// Strip a surrounding Markdown code fence, if any.
fn unwrap_code_fence(text: &str) -> &str {
    FENCED_JSON
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}
