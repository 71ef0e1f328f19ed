use crate::chunking::{chunk_by_length, chunk_by_pages};
use crate::embeddings::Embedder;
use crate::extractor::PdfExtractor;
use crate::models::{ChunkMetadata, IngestionOptions, Page};
use crate::store::VectorRecord;
use crate::traits::VectorIndex;
use crate::IngestError;
use chrono::Utc;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `Lecture Notes (v2).pdf` at `1700000000000` becomes `Lecture_Notes__v2__1700000000000`.
pub fn namespace_for(filename: &str, timestamp_millis: i64) -> Result<String, IngestError> {
    let extension = Regex::new(r"(?i)\.pdf$")?;
    let disallowed = Regex::new(r"[^a-zA-Z0-9-]")?;
    let stem = extension.replace(filename, "");
    Ok(format!(
        "{}_{timestamp_millis}",
        disallowed.replace_all(&stem, "_")
    ))
}

pub fn record_id(file_id: &str, chunk_index: usize) -> String {
    format!("{file_id}-chunk-{chunk_index}")
}

#[derive(Debug, Clone)]
pub struct IndexReport {
    pub namespace: String,
    pub filename: String,
    pub file_id: String,
    pub total_pages: usize,
    pub total_chunks: usize,
    pub success: usize,
    pub failed: usize,
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct FolderIndexReport {
    pub documents: Vec<IndexReport>,
    pub skipped_files: Vec<SkippedPdf>,
}

pub struct Indexer<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    embedder: E,
    store: Arc<V>,
    options: IngestionOptions,
}

impl<E, V> Indexer<E, V>
where
    E: Embedder,
    V: VectorIndex,
{
    pub fn new(embedder: E, store: Arc<V>, options: IngestionOptions) -> Self {
        Self {
            embedder,
            store,
            options,
        }
    }

    pub fn chunk_pages(&self, pages: &[Page]) -> Result<Vec<(String, Vec<u32>)>, IngestError> {
        if self.options.page_aware {
            return Ok(chunk_by_pages(pages, self.options.min_words)
                .into_iter()
                .map(|chunk| (chunk.text, chunk.page_numbers))
                .collect());
        }

        let joined = pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(chunk_by_length(&joined, self.options.chunk_size, self.options.overlap)?
            .into_iter()
            .map(|text| (text, Vec::new()))
            .collect())
    }

    /// Upserts every chunk on its own; a failed upsert is counted, not fatal.
    pub async fn index_pages(
        &self,
        pages: &[Page],
        namespace: &str,
        filename: &str,
        file_id: &str,
    ) -> Result<IndexReport, IngestError> {
        let chunks = self.chunk_pages(pages)?;
        let total_chunks = chunks.len();
        let mut success = 0usize;
        let mut failed = 0usize;

        for (chunk_index, (text, page_numbers)) in chunks.into_iter().enumerate() {
            let record = VectorRecord {
                id: record_id(file_id, chunk_index),
                values: self.embedder.embed(&text),
                metadata: ChunkMetadata {
                    text,
                    filename: filename.to_string(),
                    chunk_index: chunk_index as u64,
                    total_chunks: total_chunks as u64,
                    page_numbers,
                },
            };

            match self.store.upsert(namespace, std::slice::from_ref(&record)).await {
                Ok(()) => success += 1,
                Err(error) => {
                    warn!(namespace, chunk_index, %error, "chunk upsert failed");
                    failed += 1;
                }
            }
        }

        info!(namespace, filename, total_chunks, success, failed, "indexed document");

        Ok(IndexReport {
            namespace: namespace.to_string(),
            filename: filename.to_string(),
            file_id: file_id.to_string(),
            total_pages: pages.len(),
            total_chunks,
            success,
            failed,
        })
    }

    pub async fn index_document<X>(
        &self,
        extractor: &X,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IndexReport, IngestError>
    where
        X: PdfExtractor + ?Sized,
    {
        let pages = extractor.extract(bytes)?;
        let namespace = namespace_for(filename, Utc::now().timestamp_millis())?;
        let file_id = digest_bytes(bytes);
        self.index_pages(&pages, &namespace, filename, &file_id).await
    }

    pub async fn index_folder<X>(
        &self,
        extractor: &X,
        folder: &Path,
    ) -> Result<FolderIndexReport, IngestError>
    where
        X: PdfExtractor + ?Sized,
    {
        let files = discover_pdf_files(folder);

        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no pdf files found in {}",
                folder.display()
            )));
        }

        let mut documents = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            let indexed = match (fs::read(&path), file_name(&path)) {
                (Ok(bytes), Ok(filename)) => self.index_document(extractor, &bytes, &filename).await,
                (Err(error), _) => Err(IngestError::Io(error)),
                (_, Err(error)) => Err(error),
            };

            match indexed {
                Ok(report) => documents.push(report),
                Err(error) => skipped_files.push(SkippedPdf {
                    path,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(FolderIndexReport {
            documents,
            skipped_files,
        })
    }
}

pub fn file_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedWordEmbedder;
    use crate::extractor::LopdfExtractor;
    use crate::store::{NamespaceStats, StoreHit};
    use crate::stores::InMemoryStore;
    use crate::SearchError;
    use async_trait::async_trait;
    use std::fs::File;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn pages() -> Vec<Page> {
        vec![
            Page::new(1, vec!["chlorophyll"; 120].join(" ")),
            Page::new(2, "mitochondria produce energy"),
            Page::new(3, "ribosomes build proteins"),
        ]
    }

    fn indexer<V: VectorIndex>(store: Arc<V>, options: IngestionOptions) -> Indexer<HashedWordEmbedder, V> {
        Indexer::new(HashedWordEmbedder::default(), store, options)
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"text"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn namespace_is_sanitized_and_timestamped() -> Result<(), IngestError> {
        assert_eq!(
            namespace_for("Lecture Notes (v2).PDF", 1_700_000_000_000)?,
            "Lecture_Notes__v2__1700000000000"
        );
        assert_eq!(namespace_for("bio-101.pdf", 5)?, "bio-101_5");
        Ok(())
    }

    #[test]
    fn digest_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }

    #[tokio::test]
    async fn page_aware_indexing_writes_chunk_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(InMemoryStore::new());
        let indexer = indexer(store.clone(), IngestionOptions::default());

        let report = indexer
            .index_pages(&pages(), "biology_1", "biology.pdf", "file")
            .await?;

        assert_eq!(report.total_chunks, 2);
        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 0);

        let query = HashedWordEmbedder::default().embed("mitochondria energy");
        let hits = store.query("biology_1", &query, 5).await?;
        let best = hits[0].metadata.clone().ok_or("missing metadata")?;
        assert_eq!(hits[0].id, "file-chunk-1");
        assert_eq!(best.page_numbers, vec![2, 3]);
        assert_eq!(best.total_chunks, 2);
        assert_eq!(best.filename, "biology.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn fallback_chunking_has_no_page_attribution() -> Result<(), IngestError> {
        let store = Arc::new(InMemoryStore::new());
        let options = IngestionOptions {
            page_aware: false,
            chunk_size: 200,
            overlap: 20,
            ..IngestionOptions::default()
        };
        let indexer = indexer(store, options);

        let chunks = indexer.chunk_pages(&pages())?;
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|(_, pages)| pages.is_empty()));
        Ok(())
    }

    struct FlakyStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for FlakyStore {
        async fn upsert(&self, _namespace: &str, _records: &[VectorRecord]) -> Result<(), SearchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SearchError::Request("timeout".to_string()));
            }
            Ok(())
        }

        async fn query(
            &self,
            _namespace: &str,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<StoreHit>, SearchError> {
            Ok(Vec::new())
        }

        async fn stats(&self) -> Result<Vec<NamespaceStats>, SearchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_upserts_are_counted() -> Result<(), IngestError> {
        let store = Arc::new(FlakyStore {
            calls: AtomicUsize::new(0),
        });
        let indexer = indexer(store, IngestionOptions::default());

        let report = indexer.index_pages(&pages(), "ns", "doc.pdf", "id").await?;
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn folder_without_pdfs_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let indexer = indexer(Arc::new(InMemoryStore::new()), IngestionOptions::default());
        let result = indexer.index_folder(&LopdfExtractor, dir.path()).await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_pdfs_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;
        let indexer = indexer(Arc::new(InMemoryStore::new()), IngestionOptions::default());

        let report = indexer.index_folder(&LopdfExtractor, dir.path()).await?;

        assert!(report.documents.is_empty());
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("unreadable.pdf")
        );
        Ok(())
    }
}
