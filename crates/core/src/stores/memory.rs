use crate::embeddings::cosine_similarity;
use crate::store::{NamespaceStats, StoreHit, VectorRecord};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    namespaces: RwLock<BTreeMap<String, Vec<VectorRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> SearchError {
    SearchError::Request("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for InMemoryStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), SearchError> {
        let mut namespaces = self.namespaces.write().map_err(|_| poisoned())?;
        let stored = namespaces.entry(namespace.to_string()).or_default();

        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<StoreHit>, SearchError> {
        let namespaces = self.namespaces.read().map_err(|_| poisoned())?;
        let Some(records) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<StoreHit> = records
            .iter()
            .map(|record| StoreHit {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: Some(record.metadata.clone()),
            })
            .collect();
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
        let namespaces = self.namespaces.read().map_err(|_| poisoned())?;
        Ok(namespaces
            .iter()
            .map(|(name, records)| NamespaceStats {
                namespace: name.clone(),
                record_count: records.len() as u64,
            })
            .collect())
    }
}
