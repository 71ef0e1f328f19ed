use crate::store::{NamespaceStats, StoreHit, VectorRecord};
use crate::{GenerationError, SearchError};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), SearchError>;

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<StoreHit>, SearchError>;

    async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError>;
}

#[async_trait]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
