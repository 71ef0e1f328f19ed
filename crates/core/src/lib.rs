pub mod answer;
pub mod batching;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod generation;
pub mod history;
pub mod hosting;
pub mod ingest;
pub mod models;
pub mod quiz;
pub mod store;
pub mod stores;
pub mod traits;

pub use answer::AnswerService;
pub use batching::{batch_text, group_into_batches};
pub use chunking::{chunk_by_length, chunk_by_pages, count_words, normalize_whitespace};
pub use embeddings::{Embedder, HashedWordEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{GenerationError, IngestError, PersistenceError, QueryError, SearchError};
pub use extractor::{extract_pdf_file, LopdfExtractor, PdfExtractor};
pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL};
pub use generation::{strip_code_fence, QuestionMix};
pub use history::{record_exchange, ConversationStore, JsonConversationStore};
pub use hosting::{DocumentHost, LocalDocumentHost};
pub use ingest::{
    digest_bytes, discover_pdf_files, namespace_for, FolderIndexReport, IndexReport, Indexer,
    SkippedPdf,
};
pub use models::{
    Answer, AnswerOptions, BatchQuizResult, ChunkMetadata, Confidence, Difficulty,
    IngestionOptions, NamespaceSummary, Page, PageChunk, QuestionBreakdown, QuestionType,
    QuizOptions, QuizQuestion, QuizReport, RetrievalMatch,
};
pub use quiz::{QuizGenerator, QuizRunState};
pub use store::{summarize_namespaces, NamespaceStats, StoreHit, VectorRecord};
pub use stores::{InMemoryStore, PineconeStore};
pub use traits::{TextGenerator, VectorIndex};
