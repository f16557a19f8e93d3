use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::AnalysisRequest;
use super::DiagnosisError;
use crate::config::AnalysisConfig;

/// Submits one analysis request to the external service.
///
/// Returns the reply text, or `None` when the service answered without any.
/// Implementations must not retry; the orchestrator treats one call as one attempt.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn submit(&self, request: &AnalysisRequest) -> Result<Option<String>, DiagnosisError>;
}

/// HTTP client for the generative-language `generateContent` endpoint.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self, DiagnosisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DiagnosisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Wire types ──────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn to_wire(request: &AnalysisRequest) -> GenerateContentRequest<'_> {
    let mut parts = vec![Part::Text { text: &request.prompt }];
    if let Some(image) = &request.image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

/// Concatenated text of the first candidate, `None` if it carried no text.
fn reply_text(response: GenerateContentResponse) -> Option<String> {
    let parts = response.candidates.into_iter().next()?.content?.parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl AnalysisTransport for GeminiClient {
    async fn submit(&self, request: &AnalysisRequest) -> Result<Option<String>, DiagnosisError> {
        let body = to_wire(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    DiagnosisError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    DiagnosisError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    DiagnosisError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiagnosisError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DiagnosisError::MalformedResponse(e.to_string()))?;

        Ok(reply_text(parsed))
    }
}

// ── Mock ────────────────────────────────────────────────

/// Canned outcome for `MockTransport`.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(Option<String>),
    ServiceError { status: u16, body: String },
    Unreachable,
}

/// Mock transport for testing. Returns a configured reply and records requests.
pub struct MockTransport {
    reply: MockReply,
    delay: Option<Duration>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl MockTransport {
    pub fn new(reply: &str) -> Self {
        Self::with_reply(MockReply::Text(Some(reply.to_string())))
    }

    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisTransport for MockTransport {
    async fn submit(&self, request: &AnalysisRequest) -> Result<Option<String>, DiagnosisError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::ServiceError { status, body } => Err(DiagnosisError::ServiceError {
                status: *status,
                body: body.clone(),
            }),
            MockReply::Unreachable => Err(DiagnosisError::Connection("mock://analysis".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diagnosis::types::ImageData;

    fn config(base_url: &str) -> AnalysisConfig {
        AnalysisConfig::new("test-key").with_base_url(base_url)
    }

    fn request(image: Option<ImageData>) -> AnalysisRequest {
        AnalysisRequest {
            prompt: "分析".into(),
            image,
            response_schema: serde_json::json!({"type": "OBJECT"}),
        }
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = GeminiClient::new(&config("https://example.test/")).unwrap();
        assert_eq!(client.base_url, "https://example.test");
        assert_eq!(
            client.endpoint(),
            format!("https://example.test/v1beta/models/{}:generateContent", client.model())
        );
    }

    #[test]
    fn wire_request_has_text_part_and_config() {
        let req = request(None);
        let value = serde_json::to_value(to_wire(&req)).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "分析");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn wire_request_appends_inline_image() {
        let req = request(Some(ImageData::from_bytes(b"img", "image/png")));
        let value = serde_json::to_value(to_wire(&req)).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "aW1n");
    }

    #[test]
    fn reply_text_concatenates_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}},
                              {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(response).as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn reply_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(reply_text(response).is_none());

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(reply_text(blocked).is_none());
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let transport = MockTransport::new("{}");
        let reply = transport.submit(&request(None)).await.unwrap();
        assert_eq!(reply.as_deref(), Some("{}"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_service_error() {
        let transport = MockTransport::with_reply(MockReply::ServiceError {
            status: 429,
            body: "quota".into(),
        });
        let err = transport.submit(&request(None)).await.unwrap_err();
        assert!(matches!(err, DiagnosisError::ServiceError { status: 429, .. }));
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_connection_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = GeminiClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.submit(&request(None)).await.unwrap_err();
        assert!(matches!(
            err,
            DiagnosisError::Connection(_) | DiagnosisError::HttpClient(_)
        ));
    }
}
