pub mod types;
pub mod retrieval;
pub mod prompt;
pub mod parser;
pub mod gemini;
pub mod gate;
pub mod manual;
pub mod orchestrator;

pub use types::*;
pub use retrieval::*;
pub use prompt::*;
pub use parser::*;
pub use gemini::*;
pub use gate::*;
pub use manual::*;
pub use orchestrator::*;

use thiserror::Error;

/// Shown for every failure the operator cannot fix by editing the form.
pub const ENGINE_FAILURE_MESSAGE: &str = "分析引擎异常，请稍后重试。";

/// Shown when a second submission arrives while one is in flight.
pub const BUSY_MESSAGE: &str = "已有诊断请求正在进行中，请稍候。";

/// Used when the service rejects the input without saying why.
pub const DEFAULT_INSUFFICIENT_REASON: &str =
    "录入信息无效或不足，无法生成准确的分析结果，请提供更详细的故障表现描述。";

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("{0}")]
    InvalidSubmission(String),

    #[error("A diagnosis request is already in flight")]
    Busy,

    #[error("Analysis service returned an empty response")]
    EmptyResponse,

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    /// The service judged the description too vague or unrelated.
    /// Carries the service-supplied explanation verbatim.
    #[error("{0}")]
    InsufficientInput(String),

    #[error("Analysis service is not reachable at {0}")]
    Connection(String),

    #[error("Analysis service returned error (status {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl DiagnosisError {
    /// Display-ready message for the operator.
    ///
    /// Input problems are surfaced as-is so the operator can correct the form;
    /// transport and parse failures collapse into one generic retry message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientInput(reason) => reason.clone(),
            Self::InvalidSubmission(message) => message.clone(),
            Self::Busy => BUSY_MESSAGE.to_string(),
            Self::EmptyResponse
            | Self::MalformedResponse(_)
            | Self::Connection(_)
            | Self::ServiceError { .. }
            | Self::HttpClient(_) => ENGINE_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether the operator should edit the submission rather than retry as-is.
    pub fn is_input_problem(&self) -> bool {
        matches!(self, Self::InsufficientInput(_) | Self::InvalidSubmission(_))
    }
}
