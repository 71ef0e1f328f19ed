use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_quiz_core::{
    digest_bytes, extract_pdf_file, record_exchange, summarize_namespaces, AnswerOptions,
    AnswerService, DocumentHost, Embedder, GeminiClient, HashedWordEmbedder, Indexer,
    IngestionOptions, JsonConversationStore, LocalDocumentHost, LopdfExtractor, PineconeStore,
    QuizGenerator, QuizOptions, VectorIndex, DEFAULT_GEMINI_MODEL,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-quiz", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: Option<String>,

    /// Pinecone index host, e.g. my-index-abc123.svc.pinecone.io
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pinecone_host: Option<String>,

    /// Directory for chat history and hosted uploads
    #[arg(long, env = "PDF_QUIZ_DATA_DIR", default_value = ".pdf-quiz")]
    data_dir: PathBuf,

    /// Base URL under which hosted uploads are served
    #[arg(long, env = "PDF_QUIZ_PUBLIC_URL", default_value = "http://localhost:5000")]
    public_url: String,

    /// Timeout for every call to an external service, in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a quiz from a PDF, batch by batch.
    Quiz {
        /// PDF to generate questions from.
        #[arg(long)]
        file: PathBuf,
        /// Questions requested per page.
        #[arg(long, default_value = "2")]
        questions_per_page: usize,
        /// Pages per generation call.
        #[arg(long, default_value = "3")]
        batch_size: usize,
        /// Pause between generation calls, in milliseconds.
        #[arg(long, default_value = "2000")]
        delay_ms: u64,
    },
    /// Index a PDF for question answering under a new namespace.
    Index {
        /// PDF to index.
        #[arg(long)]
        file: PathBuf,
        /// Minimum words per page-aware chunk.
        #[arg(long, default_value = "100")]
        min_words: usize,
        /// Ignore page structure and chunk by character windows.
        #[arg(long, default_value_t = false)]
        character_windows: bool,
    },
    /// Index every PDF below a folder, one namespace per file.
    IndexFolder {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Answer a question from an indexed document.
    Ask {
        /// Question to answer.
        #[arg(long)]
        query: String,
        /// Namespace returned by `index`.
        #[arg(long)]
        namespace: String,
        /// Original file name, used to title the chat history.
        #[arg(long)]
        filename: Option<String>,
        /// Number of chunks to retrieve.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// List indexed documents.
    Namespaces,
}

impl Cli {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn generator(&self) -> anyhow::Result<GeminiClient> {
        let api_key = self
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is required"))?;
        Ok(GeminiClient::new(api_key, &self.gemini_model, self.timeout())?)
    }

    fn vector_store(&self, dimensions: usize) -> anyhow::Result<PineconeStore> {
        let host = self
            .pinecone_host
            .as_deref()
            .ok_or_else(|| anyhow!("PINECONE_INDEX_HOST is required"))?;
        let api_key = self
            .pinecone_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("PINECONE_API_KEY is required"))?;
        Ok(PineconeStore::new(host, api_key, dimensions, self.timeout())?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-quiz boot"
    );

    let embedder = HashedWordEmbedder::default();

    match &cli.command {
        Command::Quiz {
            file,
            questions_per_page,
            batch_size,
            delay_ms,
        } => {
            let pages = extract_pdf_file(file)?;
            info!(file = %file.display(), pages = pages.len(), "extracted document");

            let quiz = QuizGenerator::new(
                Arc::new(cli.generator()?),
                QuizOptions {
                    questions_per_page: *questions_per_page,
                    batch_size: *batch_size,
                    inter_batch_delay: Duration::from_millis(*delay_ms),
                },
            );
            let report = quiz.generate(&pages).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Index {
            file,
            min_words,
            character_windows,
        } => {
            let store = Arc::new(cli.vector_store(embedder.dimensions())?);
            let indexer = Indexer::new(
                embedder,
                store,
                IngestionOptions {
                    min_words: *min_words,
                    page_aware: !character_windows,
                    ..IngestionOptions::default()
                },
            );

            let bytes = std::fs::read(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let filename = pdf_quiz_core::ingest::file_name(file)?;
            let report = indexer
                .index_document(&LopdfExtractor, &bytes, &filename)
                .await?;

            let host = LocalDocumentHost::new(cli.data_dir.join("uploads"), &cli.public_url);
            let hosted_url = match host.store(&bytes, &digest_bytes(&bytes)).await {
                Ok(url) => Some(url),
                Err(error) => {
                    warn!(%error, "failed to keep a copy of the upload");
                    None
                }
            };

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "namespace": report.namespace,
                    "filename": report.filename,
                    "fileId": report.file_id,
                    "chunks": report.success,
                    "failed": report.failed,
                    "totalChunks": report.total_chunks,
                    "totalPages": report.total_pages,
                    "url": hosted_url,
                }))?
            );
        }
        Command::IndexFolder { folder } => {
            let store = Arc::new(cli.vector_store(embedder.dimensions())?);
            let indexer = Indexer::new(embedder, store, IngestionOptions::default());
            let report = indexer.index_folder(&LopdfExtractor, folder).await?;

            for skipped in &report.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
            }
            for document in &report.documents {
                println!(
                    "{} -> {} ({} of {} chunks)",
                    document.filename, document.namespace, document.success, document.total_chunks
                );
            }
            println!(
                "{} documents indexed, {} skipped at {}",
                report.documents.len(),
                report.skipped_files.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            query,
            namespace,
            filename,
            top_k,
        } => {
            let store = Arc::new(cli.vector_store(embedder.dimensions())?);
            let answers = AnswerService::new(
                embedder,
                store,
                Arc::new(cli.generator()?),
                AnswerOptions {
                    top_k: *top_k,
                    ..AnswerOptions::default()
                },
            );

            match answers.answer(query, namespace).await {
                Ok(answer) => {
                    let history = JsonConversationStore::new(cli.data_dir.join("history"));
                    let title = filename.as_deref().unwrap_or(namespace);
                    record_exchange(&history, namespace, title, query, &answer).await;
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                }
                Err(error) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "success": false,
                            "error": "Search failed. Please try again.",
                            "details": error.to_string(),
                        }))?
                    );
                    return Err(error.into());
                }
            }
        }
        Command::Namespaces => {
            let store = cli.vector_store(embedder.dimensions())?;
            let namespaces = summarize_namespaces(store.stats().await?);
            println!("{}", serde_json::to_string_pretty(&namespaces)?);
        }
    }

    Ok(())
}
