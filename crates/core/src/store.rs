use crate::models::{ChunkMetadata, NamespaceSummary, RetrievalMatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub id: String,
    pub score: f64,
    pub metadata: Option<ChunkMetadata>,
}

impl StoreHit {
    /// `None` when the hit carries no chunk text to ground an answer on.
    pub fn into_match(self) -> Option<RetrievalMatch> {
        let metadata = self.metadata.filter(|metadata| !metadata.text.trim().is_empty())?;
        Some(RetrievalMatch {
            text: metadata.text,
            score: self.score,
            filename: metadata.filename,
            chunk_index: Some(metadata.chunk_index),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceStats {
    pub namespace: String,
    pub record_count: u64,
}

pub fn display_name(namespace: &str) -> String {
    if namespace.is_empty() {
        return "Default".to_string();
    }

    let mut previous_is_word = false;
    namespace
        .replace('_', " ")
        .chars()
        .map(|ch| {
            let is_word = ch.is_ascii_alphanumeric();
            let mapped = if is_word && !previous_is_word {
                ch.to_ascii_uppercase()
            } else {
                ch
            };
            previous_is_word = is_word;
            mapped
        })
        .collect()
}

pub fn summarize_namespaces(stats: Vec<NamespaceStats>) -> Vec<NamespaceSummary> {
    stats
        .into_iter()
        .map(|entry| NamespaceSummary {
            display_name: display_name(&entry.namespace),
            name: entry.namespace,
            vector_count: entry.record_count,
        })
        .collect()
}
