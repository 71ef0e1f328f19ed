use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub text: String,
    pub word_count: usize,
}

impl Page {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = crate::chunking::count_words(&text);
        Self {
            page_number,
            text,
            word_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChunk {
    pub text: String,
    pub page_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[serde(alias = "MCQ", alias = "Mcq")]
    Mcq,
    #[serde(alias = "SAQ", alias = "Saq")]
    Saq,
    #[serde(alias = "LAQ", alias = "Laq")]
    Laq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy")]
    Easy,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Hard")]
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub page_numbers: Vec<u32>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchQuizResult {
    pub questions: Vec<QuizQuestion>,
    pub summary: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBreakdown {
    pub mcq: usize,
    pub saq: usize,
    pub laq: usize,
}

impl QuestionBreakdown {
    pub fn from_questions(questions: &[QuizQuestion]) -> Self {
        questions
            .iter()
            .fold(Self::default(), |mut breakdown, question| {
                match question.kind {
                    QuestionType::Mcq => breakdown.mcq += 1,
                    QuestionType::Saq => breakdown.saq += 1,
                    QuestionType::Laq => breakdown.laq += 1,
                }
                breakdown
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub total_questions: usize,
    pub total_pages: usize,
    pub batches_processed: usize,
    pub questions: Vec<QuizQuestion>,
    pub breakdown: QuestionBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub text: String,
    pub filename: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    #[serde(default)]
    pub page_numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalMatch {
    pub text: String,
    pub score: f64,
    pub filename: String,
    pub chunk_index: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Heuristic label over the mean similarity score, not a calibrated probability.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::Low;
        }
        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        if average > 0.7 {
            Self::High
        } else if average > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub confidence: Confidence,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub name: String,
    pub display_name: String,
    pub vector_count: u64,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub min_words: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    pub page_aware: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            min_words: 100,
            chunk_size: 1_000,
            overlap: 200,
            page_aware: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizOptions {
    pub questions_per_page: usize,
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            questions_per_page: 2,
            batch_size: 3,
            inter_batch_delay: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub top_k: usize,
    /// Number of top matches passed to generation, clamped to 3..=5.
    pub context_window: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_window: 3,
        }
    }
}
