use std::time::Instant;

use uuid::Uuid;

use super::gate::{DiagnosisPhase, SubmissionGate};
use super::gemini::AnalysisTransport;
use super::parser::parse_analysis_reply;
use super::prompt::build_analysis_request;
use super::retrieval::retrieve_context;
use super::types::{DiagnosisSubmission, ImageData};
use super::DiagnosisError;
use crate::models::{FaultDiagnosis, KnowledgeEntry, ProcessingStatus};
use crate::region::normalize_to_province;

pub const MISSING_FIELDS_MESSAGE: &str = "请填写产品名称和故障描述。";

/// AI diagnosis orchestrator.
///
/// Coordinates: validate → normalize region → retrieve context → build request
/// → submit → validate reply → construct record. The caller owns history and
/// knowledge; both are only read, and the new record is returned for the
/// caller to store.
pub struct DiagnosisOrchestrator<T: AnalysisTransport> {
    transport: T,
    gate: SubmissionGate,
}

impl<T: AnalysisTransport> DiagnosisOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            gate: SubmissionGate::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Phase of the running submission, or the outcome of the last one.
    pub fn phase(&self) -> DiagnosisPhase {
        self.gate.phase()
    }

    /// Run one submission to a terminal outcome.
    ///
    /// No retry: a failure is reported once and the operator resubmits.
    /// A call made while another is in flight fails with `DiagnosisError::Busy`.
    pub async fn diagnose(
        &self,
        submission: &DiagnosisSubmission,
        history: &[FaultDiagnosis],
        knowledge: &[KnowledgeEntry],
    ) -> Result<FaultDiagnosis, DiagnosisError> {
        let (product_name, description) =
            require_fields(&submission.product_name, &submission.description)?;

        let guard = self.gate.try_acquire().ok_or_else(|| {
            tracing::warn!(product = %product_name, "Rejected overlapping diagnosis submission");
            DiagnosisError::Busy
        })?;

        let start_time = Instant::now();
        let category = submission.category.trim();
        let region = normalize_to_province(&submission.source_region);

        let context = retrieve_context(product_name, category, description, history, knowledge);
        let request = build_analysis_request(
            product_name,
            category,
            region,
            description,
            &context,
            submission.image.as_ref(),
        );

        tracing::debug!(
            product = %product_name,
            region = %region,
            history_refs = context.history.len(),
            knowledge_refs = context.knowledge.len(),
            has_image = request.image.is_some(),
            prompt_length = request.prompt.len(),
            "Submitting diagnosis request"
        );

        guard.advance(DiagnosisPhase::AwaitingResponse);

        let outcome = match self.transport.submit(&request).await {
            Ok(raw) => parse_analysis_reply(raw.as_deref()),
            Err(e) => Err(e),
        };

        let elapsed = start_time.elapsed();
        match outcome {
            Ok(result) => {
                guard.advance(DiagnosisPhase::Succeeded);
                tracing::info!(
                    product = %product_name,
                    region = %region,
                    severity = %result.severity,
                    confidence = result.confidence,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Diagnosis completed"
                );
                Ok(FaultDiagnosis {
                    id: new_diagnosis_id(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    product_name: product_name.to_string(),
                    category: category.to_string(),
                    description: description.to_string(),
                    source_region: region.to_string(),
                    remark: trimmed_or_none(submission.remark.as_deref()),
                    status: ProcessingStatus::Unprocessed,
                    tracking_number: None,
                    image_url: submission.image.as_ref().map(ImageData::to_data_url),
                    result,
                    actual_result: None,
                    feedback: None,
                })
            }
            Err(e) => {
                guard.advance(DiagnosisPhase::Failed);
                if e.is_input_problem() {
                    tracing::info!(
                        product = %product_name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        reason = %e,
                        "Diagnosis rejected: insufficient input"
                    );
                } else {
                    tracing::error!(
                        product = %product_name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "Diagnosis failed"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Product name and description, trimmed; both must be non-empty.
pub(crate) fn require_fields<'a>(
    product_name: &'a str,
    description: &'a str,
) -> Result<(&'a str, &'a str), DiagnosisError> {
    let product_name = product_name.trim();
    let description = description.trim();
    if product_name.is_empty() || description.is_empty() {
        return Err(DiagnosisError::InvalidSubmission(MISSING_FIELDS_MESSAGE.into()));
    }
    Ok((product_name, description))
}

pub(crate) fn trimmed_or_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn new_diagnosis_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{DiagnosisResult, Severity};
    use crate::pipeline::diagnosis::gemini::{MockReply, MockTransport};
    use crate::pipeline::diagnosis::ENGINE_FAILURE_MESSAGE;

    fn valid_reply() -> String {
        serde_json::json!({
            "isInformationValid": true,
            "faultIssue": "压力泵单向阀卡滞导致出水压力不足",
            "confidence": 0.88,
            "severity": "High",
            "reasoning": "江苏省梅雨季湿度高，水垢沉积使阀芯卡滞。",
            "suggestedActions": ["清理进水滤网", "检查单向阀"],
            "estimatedRepairCost": "¥200"
        })
        .to_string()
    }

    fn car_washer_submission() -> DiagnosisSubmission {
        DiagnosisSubmission {
            product_name: "高压洗车器".into(),
            category: "洗车器".into(),
            description: "开机后水压非常小，伴随异常抖动。".into(),
            source_region: "江苏".into(),
            remark: Some("  ".into()),
            image: None,
        }
    }

    fn past_case(product: &str, category: &str) -> FaultDiagnosis {
        FaultDiagnosis {
            id: "csa-001".into(),
            timestamp: 0,
            product_name: product.into(),
            category: category.into(),
            description: "水枪出水断断续续".into(),
            source_region: "浙江省".into(),
            remark: None,
            status: ProcessingStatus::Processed,
            tracking_number: None,
            image_url: None,
            result: DiagnosisResult {
                fault_issue: "进水不足".into(),
                confidence: 0.7,
                severity: Severity::Medium,
                reasoning: String::new(),
                suggested_actions: vec![],
                estimated_repair_cost: String::new(),
            },
            actual_result: Some("进水滤网严重堵塞".into()),
            feedback: None,
        }
    }

    #[tokio::test]
    async fn end_to_end_with_empty_context() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let submitted_at = chrono::Utc::now().timestamp_millis();

        let record = orchestrator
            .diagnose(&car_washer_submission(), &[], &[])
            .await
            .unwrap();

        assert_eq!(record.source_region, "江苏省");
        assert_eq!(record.product_name, "高压洗车器");
        assert_eq!(record.status, ProcessingStatus::Unprocessed);
        assert!(record.timestamp >= submitted_at);
        assert!(!record.id.is_empty());
        assert!(!record.is_manual());
        assert!(record.remark.is_none());
        assert_eq!(record.result.severity, Severity::High);
        assert_eq!(record.result.confidence_percent(), 88);
        assert_eq!(record.result.estimated_repair_cost, "");
        assert_eq!(orchestrator.phase(), DiagnosisPhase::Succeeded);

        let requests = orchestrator.transport().requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("地域环境: 江苏省"));
        assert!(prompt.contains("参考历史: []"));
        assert!(prompt.contains("参考专家库: []"));
    }

    #[tokio::test]
    async fn each_success_gets_fresh_id() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let a = orchestrator.diagnose(&car_washer_submission(), &[], &[]).await.unwrap();
        let b = orchestrator.diagnose(&car_washer_submission(), &[], &[]).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn history_context_reaches_prompt() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let history = vec![past_case("便携洗车枪", "洗车器")];

        orchestrator
            .diagnose(&car_washer_submission(), &history, &[])
            .await
            .unwrap();

        let prompt = &orchestrator.transport().requests()[0].prompt;
        assert!(prompt.contains("水枪出水断断续续"));
        assert!(prompt.contains("进水滤网严重堵塞"));
    }

    #[tokio::test]
    async fn insufficient_input_fails_with_service_reason() {
        let reply = r#"{"isInformationValid": false, "invalidReason": "描述过于模糊"}"#;
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(reply));

        let err = orchestrator
            .diagnose(&car_washer_submission(), &[], &[])
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "描述过于模糊");
        assert_eq!(err.to_string(), "描述过于模糊");
        assert_eq!(orchestrator.phase(), DiagnosisPhase::Failed);
    }

    #[tokio::test]
    async fn empty_reply_fails_with_generic_message() {
        let orchestrator =
            DiagnosisOrchestrator::new(MockTransport::with_reply(MockReply::Text(None)));

        let err = orchestrator
            .diagnose(&car_washer_submission(), &[], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, DiagnosisError::EmptyResponse));
        assert_eq!(err.user_message(), ENGINE_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn transport_failure_yields_no_record() {
        let orchestrator =
            DiagnosisOrchestrator::new(MockTransport::with_reply(MockReply::Unreachable));

        let err = orchestrator
            .diagnose(&car_washer_submission(), &[], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, DiagnosisError::Connection(_)));
        assert_eq!(orchestrator.phase(), DiagnosisPhase::Failed);
        // Exactly one attempt.
        assert_eq!(orchestrator.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_never_reach_transport() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let mut submission = car_washer_submission();
        submission.description = "   ".into();

        let err = orchestrator.diagnose(&submission, &[], &[]).await.unwrap_err();

        assert!(matches!(err, DiagnosisError::InvalidSubmission(_)));
        assert_eq!(err.user_message(), MISSING_FIELDS_MESSAGE);
        assert!(orchestrator.transport().requests().is_empty());
        assert_eq!(orchestrator.phase(), DiagnosisPhase::Idle);
    }

    #[tokio::test]
    async fn image_is_forwarded_inline() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let mut submission = car_washer_submission();
        submission.image = ImageData::from_data_url("data:image/jpeg;base64,/9j/4AAQ");

        orchestrator.diagnose(&submission, &[], &[]).await.unwrap();

        let image = orchestrator.transport().requests()[0].image.clone().unwrap();
        assert_eq!(image.data, "/9j/4AAQ");
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn attached_image_is_kept_on_record() {
        let orchestrator = DiagnosisOrchestrator::new(MockTransport::new(&valid_reply()));
        let mut submission = car_washer_submission();
        submission.image = ImageData::from_data_url("data:image/png;base64,iVBORw0K");

        let record = orchestrator.diagnose(&submission, &[], &[]).await.unwrap();

        assert_eq!(record.image_url.as_deref(), Some("data:image/png;base64,iVBORw0K"));

        let plain = orchestrator
            .diagnose(&car_washer_submission(), &[], &[])
            .await
            .unwrap();
        assert!(plain.image_url.is_none());
    }

    #[tokio::test]
    async fn overlapping_submission_is_rejected() {
        let transport = MockTransport::new(&valid_reply()).with_delay(Duration::from_millis(50));
        let orchestrator = DiagnosisOrchestrator::new(transport);
        let submission = car_washer_submission();

        let (first, second) = tokio::join!(
            orchestrator.diagnose(&submission, &[], &[]),
            orchestrator.diagnose(&submission, &[], &[]),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(DiagnosisError::Busy)));
        assert_eq!(orchestrator.transport().requests().len(), 1);

        // The gate is released once the first submission finishes.
        assert!(orchestrator.diagnose(&submission, &[], &[]).await.is_ok());
    }

    #[test]
    fn remark_is_trimmed_or_dropped() {
        assert_eq!(trimmed_or_none(Some("  沙尘大 ")), Some("沙尘大".into()));
        assert_eq!(trimmed_or_none(Some("   ")), None);
        assert_eq!(trimmed_or_none(None), None);
    }
}
