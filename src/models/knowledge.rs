use serde::{Deserialize, Serialize};

/// A curated cause/solution pairing contributed by support staff.
///
/// At most one entry exists per (`product_name`, `fault_type`) pair; see
/// `TriageWorkspace::save_to_knowledge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub id: String,
    pub product_name: String,
    pub fault_type: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub solution: String,
}

impl KnowledgeEntry {
    /// Whether both entries describe the same product/fault pair.
    pub fn same_pair(&self, other: &KnowledgeEntry) -> bool {
        self.product_name == other.product_name && self.fault_type == other.fault_type
    }
}
