use crate::models::{FaultDiagnosis, KnowledgeEntry};

use super::types::{HistoryReference, RetrievedContext, MAX_CONTEXT_ITEMS, UNVERIFIED_ACTUAL};

/// Past cases for the same product or the same category, newest first.
///
/// `history` is stored newest-first, so source order is recency order.
pub fn relevant_history(
    product_name: &str,
    category: &str,
    history: &[FaultDiagnosis],
) -> Vec<HistoryReference> {
    history
        .iter()
        .filter(|h| h.product_name == product_name || h.category == category)
        .take(MAX_CONTEXT_ITEMS)
        .map(|h| HistoryReference {
            issue: h.description.clone(),
            actual: h
                .actual_result
                .clone()
                .unwrap_or_else(|| UNVERIFIED_ACTUAL.to_string()),
        })
        .collect()
}

/// Knowledge entries whose product name contains the candidate's, or whose
/// fault location is mentioned in the description.
///
/// An empty `location` is contained in every description and therefore matches.
pub fn relevant_knowledge<'a>(
    product_name: &str,
    description: &str,
    knowledge: &'a [KnowledgeEntry],
) -> Vec<&'a KnowledgeEntry> {
    knowledge
        .iter()
        .filter(|k| k.product_name.contains(product_name) || description.contains(&k.location))
        .take(MAX_CONTEXT_ITEMS)
        .collect()
}

/// Run both filters for one candidate.
pub fn retrieve_context<'a>(
    product_name: &str,
    category: &str,
    description: &str,
    history: &[FaultDiagnosis],
    knowledge: &'a [KnowledgeEntry],
) -> RetrievedContext<'a> {
    let context = RetrievedContext {
        history: relevant_history(product_name, category, history),
        knowledge: relevant_knowledge(product_name, description, knowledge),
    };

    tracing::debug!(
        history_candidates = history.len(),
        knowledge_candidates = knowledge.len(),
        history_used = context.history.len(),
        knowledge_used = context.knowledge.len(),
        "Retrieved diagnosis context"
    );

    context
}
