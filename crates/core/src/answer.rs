use crate::embeddings::Embedder;
use crate::models::{Answer, AnswerOptions, Confidence, RetrievalMatch};
use crate::store::StoreHit;
use crate::traits::{TextGenerator, VectorIndex};
use crate::QueryError;
use std::sync::Arc;
use tracing::{debug, info};

const MIN_CONTEXT_WINDOW: usize = 3;
const MAX_CONTEXT_WINDOW: usize = 5;

pub struct AnswerService<E, V, G>
where
    E: Embedder,
    V: VectorIndex,
    G: TextGenerator,
{
    embedder: E,
    store: Arc<V>,
    generator: Arc<G>,
    options: AnswerOptions,
}

impl<E, V, G> AnswerService<E, V, G>
where
    E: Embedder,
    V: VectorIndex,
    G: TextGenerator,
{
    pub fn new(embedder: E, store: Arc<V>, generator: Arc<G>, options: AnswerOptions) -> Self {
        Self {
            embedder,
            store,
            generator,
            options,
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        namespace: &str,
    ) -> Result<Vec<RetrievalMatch>, QueryError> {
        let vector = self.embedder.embed(query);
        let hits = self
            .store
            .query(namespace, &vector, self.options.top_k)
            .await
            .map_err(|error| QueryError::retrieval("vector query", error))?;
        Ok(hits.into_iter().filter_map(StoreHit::into_match).collect())
    }

    pub async fn answer(&self, query: &str, namespace: &str) -> Result<Answer, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InvalidArgument("query is required".to_string()));
        }
        if namespace.trim().is_empty() {
            return Err(QueryError::InvalidArgument(
                "namespace is required".to_string(),
            ));
        }

        let matches = self.retrieve(query, namespace).await?;
        let window = context_window(self.options.context_window, matches.len());
        let selected = &matches[..window];
        debug!(namespace, retrieved = matches.len(), selected = window, "retrieved context");

        let prompt = build_answer_prompt(query, selected);
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|error| QueryError::retrieval("generation", error))?;

        let scores: Vec<f64> = selected.iter().map(|hit| hit.score).collect();
        let confidence = Confidence::from_scores(&scores);
        info!(namespace, confidence = confidence.as_str(), "answered query");

        Ok(Answer {
            answer: answer.trim().to_string(),
            confidence,
            sources: selected.iter().map(|hit| hit.filename.clone()).collect(),
        })
    }
}

fn context_window(requested: usize, available: usize) -> usize {
    requested
        .clamp(MIN_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW)
        .min(available)
}

pub fn build_answer_prompt(query: &str, context: &[RetrievalMatch]) -> String {
    let excerpts = if context.is_empty() {
        "(no matching passages were found in the document)".to_string()
    } else {
        context
            .iter()
            .enumerate()
            .map(|(index, hit)| format!("Excerpt {}:\n{}", index + 1, hit.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        r#"You are a helpful study assistant answering questions about a document the user uploaded.

Document excerpts:
{excerpts}

Question: {query}

Guidelines:
1. Answer from the excerpts wherever they are relevant and cite page numbers shown as [Page N] when useful.
2. If the excerpts only partly cover the question, answer what they support and fill the gaps with general knowledge, saying which parts are general.
3. If nothing relevant was found, still give a helpful answer from general knowledge and mention that the document did not cover it. Never refuse outright.
4. Do not mention excerpt numbers, similarity scores, chunk ids or how the excerpts were retrieved.
5. Keep the answer clear and well structured."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedWordEmbedder;
    use crate::models::ChunkMetadata;
    use crate::store::{NamespaceStats, StoreHit, VectorRecord};
    use crate::stores::InMemoryStore;
    use crate::{GenerationError, SearchError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            if self.fail {
                return Err(GenerationError::EmptyResponse);
            }
            Ok("  Chlorophyll absorbs light.  ".to_string())
        }
    }

    struct ScoredStore {
        scores: Vec<f64>,
    }

    #[async_trait]
    impl VectorIndex for ScoredStore {
        async fn upsert(&self, _namespace: &str, _records: &[VectorRecord]) -> Result<(), SearchError> {
            Ok(())
        }

        async fn query(
            &self,
            _namespace: &str,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<StoreHit>, SearchError> {
            Ok(self
                .scores
                .iter()
                .take(top_k)
                .enumerate()
                .map(|(index, score)| StoreHit {
                    id: format!("file-chunk-{index}"),
                    score: *score,
                    metadata: Some(ChunkMetadata {
                        text: format!("[Page {}]\npassage {index}", index + 1),
                        filename: format!("doc{index}.pdf"),
                        chunk_index: index as u64,
                        total_chunks: 10,
                        page_numbers: vec![index as u32 + 1],
                    }),
                })
                .collect())
        }

        async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
            Ok(Vec::new())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl VectorIndex for BrokenStore {
        async fn upsert(&self, _namespace: &str, _records: &[VectorRecord]) -> Result<(), SearchError> {
            Err(SearchError::Request("down".to_string()))
        }

        async fn query(
            &self,
            _namespace: &str,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<StoreHit>, SearchError> {
            Err(SearchError::Request("down".to_string()))
        }

        async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
            Err(SearchError::Request("down".to_string()))
        }
    }

    fn service<V: VectorIndex>(
        store: V,
        generator: Arc<EchoGenerator>,
    ) -> AnswerService<HashedWordEmbedder, V, EchoGenerator> {
        AnswerService::new(
            HashedWordEmbedder::default(),
            Arc::new(store),
            generator,
            AnswerOptions::default(),
        )
    }

    #[tokio::test]
    async fn high_scores_give_high_confidence_and_three_sources() -> Result<(), QueryError> {
        let generator = Arc::new(EchoGenerator::default());
        let answers = service(
            ScoredStore {
                scores: vec![0.9, 0.85, 0.8, 0.1, 0.1],
            },
            generator.clone(),
        );

        let answer = answers.answer("What absorbs light?", "biology").await?;

        assert_eq!(answer.answer, "Chlorophyll absorbs light.");
        assert_eq!(answer.confidence, Confidence::High);
        assert_eq!(answer.sources, vec!["doc0.pdf", "doc1.pdf", "doc2.pdf"]);

        let prompts = generator.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert!(prompts[0].contains("passage 2"));
        assert!(!prompts[0].contains("passage 3"));
        assert!(!prompts[0].contains("0.85"));
        Ok(())
    }

    #[tokio::test]
    async fn window_is_capped_by_available_matches() -> Result<(), QueryError> {
        let answers = service(
            ScoredStore {
                scores: vec![0.5, 0.5],
            },
            Arc::new(EchoGenerator::default()),
        );

        let answer = answers.answer("osmosis", "biology").await?;
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.confidence, Confidence::Medium);
        Ok(())
    }

    struct UnlabelledTopHit(ScoredStore);

    #[async_trait]
    impl VectorIndex for UnlabelledTopHit {
        async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), SearchError> {
            self.0.upsert(namespace, records).await
        }

        async fn query(
            &self,
            namespace: &str,
            vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<StoreHit>, SearchError> {
            let mut hits = self.0.query(namespace, vector, top_k).await?;
            if let Some(first) = hits.first_mut() {
                first.metadata = None;
            }
            Ok(hits)
        }

        async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
            self.0.stats().await
        }
    }

    #[tokio::test]
    async fn hits_without_text_are_not_used_as_context() -> Result<(), QueryError> {
        let answers = service(
            UnlabelledTopHit(ScoredStore {
                scores: vec![0.95, 0.5, 0.5],
            }),
            Arc::new(EchoGenerator::default()),
        );

        let answer = answers.answer("osmosis", "biology").await?;
        assert_eq!(answer.sources, vec!["doc1.pdf", "doc2.pdf"]);
        assert_eq!(answer.confidence, Confidence::Medium);
        Ok(())
    }

    #[tokio::test]
    async fn no_matches_still_answers_with_low_confidence() -> Result<(), QueryError> {
        let generator = Arc::new(EchoGenerator::default());
        let answers = service(InMemoryStore::new(), generator.clone());

        let answer = answers.answer("What is entropy?", "empty").await?;
        assert_eq!(answer.confidence, Confidence::Low);
        assert!(answer.sources.is_empty());

        let prompts = generator.prompts.lock().map(|p| p.clone()).unwrap_or_default();
        assert!(prompts[0].contains("no matching passages"));
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_retrieval_failed() {
        let answers = service(BrokenStore, Arc::new(EchoGenerator::default()));
        let result = answers.answer("anything", "biology").await;
        assert!(matches!(
            result,
            Err(QueryError::RetrievalFailed {
                stage: "vector query",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn generation_failure_is_retrieval_failed() {
        let generator = Arc::new(EchoGenerator {
            fail: true,
            ..EchoGenerator::default()
        });
        let answers = service(
            ScoredStore {
                scores: vec![0.9],
            },
            generator,
        );

        let result = answers.answer("anything", "biology").await;
        assert!(matches!(
            result,
            Err(QueryError::RetrievalFailed {
                stage: "generation",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn blank_query_or_namespace_is_invalid() {
        let answers = service(InMemoryStore::new(), Arc::new(EchoGenerator::default()));
        assert!(matches!(
            answers.answer("  ", "biology").await,
            Err(QueryError::InvalidArgument(_))
        ));
        assert!(matches!(
            answers.answer("question", "").await,
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn context_window_is_clamped() {
        assert_eq!(context_window(1, 10), 3);
        assert_eq!(context_window(4, 10), 4);
        assert_eq!(context_window(9, 10), 5);
        assert_eq!(context_window(5, 2), 2);
    }
}
