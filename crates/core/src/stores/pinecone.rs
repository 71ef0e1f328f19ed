use crate::models::ChunkMetadata;
use crate::store::{NamespaceStats, StoreHit, VectorRecord};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub struct PineconeStore {
    host: Url,
    api_key: String,
    client: Client,
    vector_size: usize,
}

impl PineconeStore {
    pub fn new(
        host: &str,
        api_key: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            Url::parse(host)?
        } else {
            Url::parse(&format!("https://{host}"))?
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            host,
            api_key: api_key.into(),
            client,
            vector_size,
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(self.host.join(path)?)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "pinecone".to_string(),
                details: format!("{status}: {details}"),
            });
        }

        Ok(response.json().await?)
    }

    fn upsert_body(
        &self,
        namespace: &str,
        records: &[VectorRecord],
    ) -> Result<Value, SearchError> {
        let vectors = records
            .iter()
            .map(|record| {
                self.check_dimension(record.values.len())?;
                Ok(json!({
                    "id": record.id,
                    "values": record.values,
                    "metadata": encode_metadata(&record.metadata),
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(json!({ "vectors": vectors, "namespace": namespace }))
    }

    fn check_dimension(&self, length: usize) -> Result<(), SearchError> {
        if length != self.vector_size {
            return Err(SearchError::Request(format!(
                "vector dimension {} != {}",
                length, self.vector_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), SearchError> {
        if records.is_empty() {
            return Ok(());
        }

        let body = self.upsert_body(namespace, records)?;
        self.post("vectors/upsert", body).await?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<StoreHit>, SearchError> {
        self.check_dimension(vector.len())?;

        let parsed = self
            .post(
                "query",
                json!({
                    "namespace": namespace,
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        Ok(parse_matches(&parsed))
    }

    async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
        let parsed = self.post("describe_index_stats", json!({})).await?;
        Ok(parse_stats(&parsed))
    }
}

// Pinecone metadata lists may only hold strings.
fn encode_metadata(metadata: &ChunkMetadata) -> Value {
    let page_numbers: Vec<String> = metadata.page_numbers.iter().map(u32::to_string).collect();
    json!({
        "text": metadata.text,
        "filename": metadata.filename,
        "chunkIndex": metadata.chunk_index,
        "totalChunks": metadata.total_chunks,
        "pageNumbers": page_numbers,
    })
}

fn decode_metadata(value: &Value) -> Option<ChunkMetadata> {
    let text = value.get("text")?.as_str()?;
    if text.trim().is_empty() {
        return None;
    }

    Some(ChunkMetadata {
        text: text.to_string(),
        filename: value.get("filename")?.as_str()?.to_string(),
        chunk_index: whole_number(value.get("chunkIndex")?)?,
        total_chunks: whole_number(value.get("totalChunks")?)?,
        page_numbers: value
            .get("pageNumbers")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(page_number).collect())
            .unwrap_or_default(),
    })
}

// Numbers can come back as floats (`0.0`).
fn whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|number| *number >= 0.0 && number.fract() == 0.0)
            .map(|number| number as u64)
    })
}

fn page_number(value: &Value) -> Option<u32> {
    match value {
        Value::String(raw) => raw.trim().parse().ok(),
        other => whole_number(other).and_then(|number| u32::try_from(number).ok()),
    }
}

fn parse_matches(parsed: &Value) -> Vec<StoreHit> {
    let Some(matches) = parsed.pointer("/matches").and_then(Value::as_array) else {
        return Vec::new();
    };

    matches
        .iter()
        .filter_map(|hit| {
            let id = hit.pointer("/id").and_then(Value::as_str).unwrap_or_default();
            let Some(metadata) = hit.pointer("/metadata").and_then(decode_metadata) else {
                warn!(id, "dropping match without usable chunk metadata");
                return None;
            };
            Some(StoreHit {
                id: id.to_string(),
                score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                metadata: Some(metadata),
            })
        })
        .collect()
}

fn parse_stats(parsed: &Value) -> Vec<NamespaceStats> {
    let mut stats: Vec<NamespaceStats> = parsed
        .pointer("/namespaces")
        .and_then(Value::as_object)
        .map(|namespaces| {
            namespaces
                .iter()
                .map(|(name, entry)| NamespaceStats {
                    namespace: name.clone(),
                    record_count: entry
                        .pointer("/vectorCount")
                        .or_else(|| entry.pointer("/recordCount"))
                        .and_then(Value::as_u64)
                        .unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();
    stats.sort_by(|left, right| left.namespace.cmp(&right.namespace));
    stats
}
