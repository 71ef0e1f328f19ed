use crate::error::IngestError;
use crate::models::{Page, PageChunk};

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ECMAScript `\s`: differs from Unicode White_Space on U+0085 and U+FEFF.
fn is_word_separator(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\u{b}' | '\u{c}' | '\r' | ' ' | '\u{a0}' | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}' | '\u{2029}' | '\u{202f}' | '\u{205f}' | '\u{3000}' | '\u{feff}'
    )
}

pub(crate) fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_word_separator).filter(|word| !word.is_empty())
}

pub fn count_words(text: &str) -> usize {
    words(text).count()
}

pub(crate) fn page_marker(page_number: u32) -> String {
    format!("[Page {page_number}]")
}

/// Merges consecutive pages into chunks of at least `min_words` words.
pub fn chunk_by_pages(pages: &[Page], min_words: usize) -> Vec<PageChunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_pages: Vec<u32> = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(&page_marker(page.page_number));
        buffer.push('\n');
        buffer.push_str(&page.text);
        buffer_pages.push(page.page_number);

        let total_words = count_words(&buffer);
        let is_last = index + 1 == pages.len();
        let next_words = pages
            .get(index + 1)
            .map(|next| count_words(&next.text))
            .unwrap_or(0);
        let merge_next = total_words < min_words && next_words < min_words;

        if is_last || (!merge_next && total_words >= min_words) {
            chunks.push(PageChunk {
                text: std::mem::take(&mut buffer),
                page_numbers: std::mem::take(&mut buffer_pages),
            });
        }
    }

    chunks
}

pub fn chunk_by_length(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, IngestError> {
    if chunk_size == 0 {
        return Err(IngestError::InvalidArgument(
            "chunk size must be at least 1".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(IngestError::InvalidArgument(format!(
            "overlap {overlap} must be smaller than chunk size {chunk_size}"
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = start + chunk_size;
        if end < chars.len() {
            let boundary = chars[start..=end]
                .iter()
                .rposition(|ch| matches!(ch, '.' | '\n' | ' '))
                .map(|offset| start + offset);
            if let Some(boundary) = boundary {
                if boundary as f64 > start as f64 + chunk_size as f64 * 0.5 {
                    end = boundary + 1;
                }
            }
        }
        let end = end.min(chars.len());

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    Ok(chunks)
}
