//! Triage workspace: the history and knowledge collections an operator works on.
//!
//! Both collections are loaded from and saved to a `KeyValueStore` under two
//! fixed keys as JSON arrays. History is kept newest-first. Mutations address
//! records by id and fail with `NotFound` when the id is unknown.

pub mod seed;
pub mod search;
pub mod stats;

pub use search::*;
pub use stats::*;

use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FaultDiagnosis, Feedback, KnowledgeEntry, ProcessingStatus};
use crate::store::{KeyValueStore, StoreError};

pub const HISTORY_KEY: &str = "fixwise_history";
pub const KNOWLEDGE_KEY: &str = "fixwise_knowledge";

const LOGISTICS_QUERY_BASE: &str = "https://www.kuaidi100.com/chaxun?nu=";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored {key} is not valid: {reason}")]
    Corrupt { key: &'static str, reason: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Knowledge entry needs a product name and fault type")]
    IncompleteKnowledge,

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of `save_to_knowledge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeUpsert {
    Inserted,
    /// An entry with the same product/fault pair was replaced in place.
    Replaced,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriageWorkspace {
    history: Vec<FaultDiagnosis>,
    knowledge: Vec<KnowledgeEntry>,
}

impl TriageWorkspace {
    pub fn new(history: Vec<FaultDiagnosis>, knowledge: Vec<KnowledgeEntry>) -> Self {
        Self { history, knowledge }
    }

    /// The built-in sample collections, with the sample case dated relative to now.
    pub fn seeded() -> Self {
        let now_ms = chrono::Utc::now().timestamp_millis();
        Self::new(seed::sample_history(now_ms), seed::sample_knowledge())
    }

    /// Load both collections. A key that was never written yields the sample
    /// data; a key holding something other than a JSON array is an error.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, WorkspaceError> {
        let now_ms = chrono::Utc::now().timestamp_millis();

        let history = match store.get(HISTORY_KEY)? {
            Some(raw) => parse_collection(HISTORY_KEY, &raw)?,
            None => seed::sample_history(now_ms),
        };
        let knowledge = match store.get(KNOWLEDGE_KEY)? {
            Some(raw) => parse_collection(KNOWLEDGE_KEY, &raw)?,
            None => seed::sample_knowledge(),
        };

        tracing::info!(
            history = history.len(),
            knowledge = knowledge.len(),
            "Workspace loaded"
        );
        Ok(Self { history, knowledge })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), WorkspaceError> {
        store.set(HISTORY_KEY, &serde_json::to_string(&self.history)?)?;
        store.set(KNOWLEDGE_KEY, &serde_json::to_string(&self.knowledge)?)?;
        tracing::debug!(
            history = self.history.len(),
            knowledge = self.knowledge.len(),
            "Workspace saved"
        );
        Ok(())
    }

    pub fn history(&self) -> &[FaultDiagnosis] {
        &self.history
    }

    pub fn knowledge(&self) -> &[KnowledgeEntry] {
        &self.knowledge
    }

    pub fn find(&self, id: &str) -> Option<&FaultDiagnosis> {
        self.history.iter().find(|d| d.id == id)
    }

    // ── History ─────────────────────────────────────────────

    /// Add a new record at the front.
    pub fn record_diagnosis(&mut self, diagnosis: FaultDiagnosis) {
        tracing::info!(id = %diagnosis.id, manual = diagnosis.is_manual(), "Diagnosis recorded");
        self.history.insert(0, diagnosis);
    }

    pub fn update_status(
        &mut self,
        id: &str,
        status: ProcessingStatus,
    ) -> Result<&FaultDiagnosis, WorkspaceError> {
        let record = self.record_mut(id)?;
        tracing::debug!(id, from = %record.status, to = %status, "Status updated");
        record.status = status;
        Ok(&*record)
    }

    /// Blank input clears the remark.
    pub fn update_remark(&mut self, id: &str, remark: &str) -> Result<&FaultDiagnosis, WorkspaceError> {
        let record = self.record_mut(id)?;
        record.remark = non_blank(remark);
        Ok(&*record)
    }

    /// Blank input clears the tracking number.
    pub fn update_tracking(
        &mut self,
        id: &str,
        tracking_number: &str,
    ) -> Result<&FaultDiagnosis, WorkspaceError> {
        let record = self.record_mut(id)?;
        record.tracking_number = non_blank(tracking_number);
        Ok(&*record)
    }

    /// Record what the fault turned out to be after repair. Blank input marks
    /// the case unverified again.
    pub fn update_actual_result(
        &mut self,
        id: &str,
        actual_result: &str,
    ) -> Result<&FaultDiagnosis, WorkspaceError> {
        let record = self.record_mut(id)?;
        record.actual_result = non_blank(actual_result);
        Ok(&*record)
    }

    pub fn set_feedback(
        &mut self,
        id: &str,
        feedback: Feedback,
    ) -> Result<&FaultDiagnosis, WorkspaceError> {
        let record = self.record_mut(id)?;
        tracing::debug!(id, rating = %feedback.rating, "Feedback recorded");
        record.feedback = Some(feedback);
        Ok(&*record)
    }

    fn record_mut(&mut self, id: &str) -> Result<&mut FaultDiagnosis, WorkspaceError> {
        self.history
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))
    }

    // ── Knowledge ───────────────────────────────────────────

    /// Insert at the front, or replace the entry with the same
    /// (product name, fault type) pair at its current position.
    pub fn save_to_knowledge(
        &mut self,
        entry: KnowledgeEntry,
    ) -> Result<KnowledgeUpsert, WorkspaceError> {
        if entry.product_name.trim().is_empty() || entry.fault_type.trim().is_empty() {
            return Err(WorkspaceError::IncompleteKnowledge);
        }

        let outcome = match self.knowledge.iter().position(|k| k.same_pair(&entry)) {
            Some(index) => {
                self.knowledge[index] = entry;
                KnowledgeUpsert::Replaced
            }
            None => {
                self.knowledge.insert(0, entry);
                KnowledgeUpsert::Inserted
            }
        };
        tracing::info!(outcome = ?outcome, total = self.knowledge.len(), "Knowledge saved");
        Ok(outcome)
    }

    /// Replace the entry with the same id.
    pub fn update_knowledge(&mut self, entry: KnowledgeEntry) -> Result<(), WorkspaceError> {
        let existing = self
            .knowledge
            .iter_mut()
            .find(|k| k.id == entry.id)
            .ok_or_else(|| WorkspaceError::NotFound(entry.id.clone()))?;
        *existing = entry;
        Ok(())
    }

    pub fn delete_knowledge(&mut self, id: &str) -> Result<KnowledgeEntry, WorkspaceError> {
        let index = self
            .knowledge
            .iter()
            .position(|k| k.id == id)
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        tracing::info!(id, "Knowledge entry deleted");
        Ok(self.knowledge.remove(index))
    }
}

/// A knowledge entry with a fresh id.
pub fn new_knowledge_entry(
    product_name: &str,
    fault_type: &str,
    cause: &str,
    location: &str,
    solution: &str,
) -> KnowledgeEntry {
    KnowledgeEntry {
        id: Uuid::new_v4().to_string(),
        product_name: product_name.trim().to_string(),
        fault_type: fault_type.trim().to_string(),
        cause: cause.trim().to_string(),
        location: location.trim().to_string(),
        solution: solution.trim().to_string(),
    }
}

/// Courier lookup page for a tracking number; `None` when blank.
pub fn logistics_query_url(tracking_number: &str) -> Option<String> {
    let tracking_number = tracking_number.trim();
    if tracking_number.is_empty() {
        return None;
    }
    Some(format!("{LOGISTICS_QUERY_BASE}{tracking_number}"))
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_collection<T: DeserializeOwned>(key: &'static str, raw: &str) -> Result<Vec<T>, WorkspaceError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::warn!(key, error = %e, "Stored collection could not be parsed");
        WorkspaceError::Corrupt {
            key,
            reason: e.to_string(),
        }
    })
}
