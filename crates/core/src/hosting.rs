use crate::PersistenceError;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait DocumentHost: Send + Sync {
    async fn store(&self, bytes: &[u8], file_id: &str) -> Result<String, PersistenceError>;
}

pub struct LocalDocumentHost {
    root: PathBuf,
    base_url: String,
}

impl LocalDocumentHost {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, file_id: &str) -> String {
        format!("{}/uploads/{file_id}", self.base_url)
    }
}

#[async_trait]
impl DocumentHost for LocalDocumentHost {
    async fn store(&self, bytes: &[u8], file_id: &str) -> Result<String, PersistenceError> {
        if file_id.is_empty() || !file_id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(PersistenceError::PersistenceFailed(format!(
                "file id {file_id:?} is not a content digest"
            )));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(format!("{file_id}.pdf")), bytes).await?;
        Ok(self.url_for(file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::digest_bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stored_documents_get_upload_urls() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let host = LocalDocumentHost::new(dir.path().join("uploads"), "http://localhost:5000/");
        let file_id = digest_bytes(b"%PDF-1.4");

        let url = host.store(b"%PDF-1.4", &file_id).await?;

        assert_eq!(url, format!("http://localhost:5000/uploads/{file_id}"));
        let stored = std::fs::read(dir.path().join("uploads").join(format!("{file_id}.pdf")))?;
        assert_eq!(stored, b"%PDF-1.4");
        Ok(())
    }

    #[tokio::test]
    async fn non_digest_ids_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let host = LocalDocumentHost::new(dir.path(), "http://localhost:5000");
        let result = host.store(b"x", "../x").await;
        assert!(matches!(result, Err(PersistenceError::PersistenceFailed(_))));
        Ok(())
    }
}
