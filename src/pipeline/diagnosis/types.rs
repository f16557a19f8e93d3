use std::path::Path;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::models::KnowledgeEntry;

/// Fixed truncation applied to both retrieval filters.
pub const MAX_CONTEXT_ITEMS: usize = 3;

/// Stands in for `actual` when a past case was never verified after repair.
pub const UNVERIFIED_ACTUAL: &str = "未核实";

/// Used when a data URL or file gives no usable MIME type.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// A candidate diagnosis as entered by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisSubmission {
    pub product_name: String,
    pub category: String,
    pub description: String,
    /// Free text; normalized before use.
    #[serde(default)]
    pub source_region: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub image: Option<ImageData>,
}

/// Base64-encoded image attached inline to the analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub mime_type: String,
    /// Base64 payload without any `data:` prefix.
    pub data: String,
}

impl ImageData {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL as produced by browser file readers.
    ///
    /// Returns `None` when there is no payload after the comma.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let (header, payload) = url.split_once(',')?;
        if payload.is_empty() {
            return None;
        }
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME);

        Some(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    /// Read and encode an image file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        Ok(Self::from_bytes(&bytes, &mime))
    }

    /// Inverse of `from_data_url`; the form stored on a record.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A past case reduced to what the model needs: what was reported, what it turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryReference {
    pub issue: String,
    pub actual: String,
}

/// Reference material selected for one analysis request.
///
/// Knowledge entries are borrowed from the caller's snapshot; nothing here
/// mutates the source collections.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext<'a> {
    pub history: Vec<HistoryReference>,
    pub knowledge: Vec<&'a KnowledgeEntry>,
}

impl RetrievedContext<'_> {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.knowledge.is_empty()
    }
}

/// Fully specified outbound request, ready for an `AnalysisTransport`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub prompt: String,
    pub image: Option<ImageData>,
    /// Expected structured reply, in the service's schema dialect.
    pub response_schema: serde_json::Value,
}
