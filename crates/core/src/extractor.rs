use crate::chunking::normalize_whitespace;
use crate::error::IngestError;
use crate::models::Page;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

pub trait PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<Page>, IngestError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| IngestError::ExtractionFailed(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => normalize_whitespace(&text),
                Err(error) => {
                    warn!(page = page_no, %error, "page text unreadable, keeping it blank");
                    String::new()
                }
            };

            let page = Page::new(page_no, text);
            debug!(page = page.page_number, words = page.word_count, "extracted page");
            pages.push(page);
        }

        ensure_readable(pages)
    }
}

pub fn extract_pdf_file(path: &Path) -> Result<Vec<Page>, IngestError> {
    let bytes = std::fs::read(path)?;
    LopdfExtractor.extract(&bytes).map_err(|error| match error {
        IngestError::ExtractionFailed(details) => {
            IngestError::ExtractionFailed(format!("{}: {details}", path.display()))
        }
        other => other,
    })
}

fn ensure_readable(pages: Vec<Page>) -> Result<Vec<Page>, IngestError> {
    if pages.iter().all(|page| page.word_count == 0) {
        return Err(IngestError::ExtractionFailed(
            "pdf had no readable page text".to_string(),
        ));
    }
    Ok(pages)
}
