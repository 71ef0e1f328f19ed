use crate::chunking::words;
use std::collections::HashMap;

const DEFAULT: usize = 1024;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Bag-of-words hashing embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashedWordEmbedder {
    pub dimensions: usize,
}

impl Default for HashedWordEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for HashedWordEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let words: Vec<&str> = words(&lowered)
            .filter(|word| word.encode_utf16().count() > 2)
            .collect();

        if words.is_empty() {
            return vector;
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, u32)> = Vec::new();
        for word in words.iter().copied() {
            match positions.get(word) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    positions.insert(word, counts.len());
                    counts.push((word, 1));
                }
            }
        }

        let (mut indexed, named): (Vec<_>, Vec<_>) = counts
            .into_iter()
            .partition(|(word, _)| array_index(word).is_some());
        indexed.sort_by_key(|(word, _)| array_index(word));

        // Written in JS object key order; the last write wins on a collision.
        let total = words.len() as f64;
        for (word, count) in indexed.into_iter().chain(named) {
            let bucket = (word_hash(word).unsigned_abs() as usize) % vector.len();
            vector[bucket] = (f64::from(count) / total) as f32;
        }

        vector
    }
}

pub fn word_hash(word: &str) -> i32 {
    word.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

// Canonical array-index keys enumerate before all other keys in a JS object.
fn array_index(word: &str) -> Option<u32> {
    if word.is_empty() || !word.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if word.len() > 1 && word.starts_with('0') {
        return None;
    }
    word.parse::<u64>()
        .ok()
        .filter(|value| *value < u64::from(u32::MAX))
        .map(|value| value as u32)
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let dot: f64 = left
        .iter()
        .zip(right)
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum();
    let left_norm = left.iter().map(|a| f64::from(*a).powi(2)).sum::<f64>().sqrt();
    let right_norm = right.iter().map(|b| f64::from(*b).powi(2)).sum::<f64>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}
