use crate::models::{Difficulty, QuestionType, QuizQuestion};
use crate::GenerationError;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionMix {
    pub total: usize,
    pub mcq: usize,
    pub saq: usize,
    pub laq: usize,
}

impl QuestionMix {
    /// Roughly 60% MCQ, 30% SAQ, the rest (at least one) LAQ.
    pub fn for_pages(page_count: usize, questions_per_page: usize) -> Self {
        let total = page_count * questions_per_page;
        let mcq = (total * 6).div_ceil(10);
        let saq = (total * 3).div_ceil(10);
        let laq = total.saturating_sub(mcq + saq).max(1);
        Self {
            total,
            mcq,
            saq,
            laq,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question: String,
    #[serde(default)]
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

impl GeneratedQuestion {
    pub fn into_question(self, id: String) -> QuizQuestion {
        QuizQuestion {
            id,
            kind: self.kind,
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            page_numbers: self.page_numbers,
            difficulty: self.difficulty,
            topic: self.topic,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedBatch {
    pub questions: Vec<GeneratedQuestion>,
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn build_batch_prompt(
    batch_text: &str,
    page_numbers: &[u32],
    previous_summary: &str,
    mix: QuestionMix,
) -> String {
    let pages = join_numbers(page_numbers);
    let context = if previous_summary.trim().is_empty() {
        String::new()
    } else {
        format!("Previous context summary:\n{previous_summary}\n\n")
    };

    format!(
        r#"You are an expert educator creating quiz questions from educational content.

{context}Current content from pages {pages}:
{batch_text}

Generate {total} high-quality quiz questions:
- {mcq} Multiple Choice Questions (MCQs)
- {saq} Short Answer Questions (SAQs)
- {laq} Long Answer Questions (LAQs)

Requirements:
1. Cover key concepts from this section
2. Consider the previous context for continuity (if provided)
3. Vary difficulty levels (easy, medium, hard)
4. MCQs should have 4 options (A, B, C, D)
5. Each question should test understanding, not just memorization
6. Provide clear explanations for correct answers

Also provide:
1. A brief summary (80-120 words) of key concepts covered in these pages
2. List of main topics/themes (3-5 topics)

Respond ONLY with valid JSON. No markdown, no code blocks, just raw JSON.

{{
  "questions": [
    {{
      "type": "mcq",
      "question": "Question text here?",
      "options": ["A) First option", "B) Second option", "C) Third option", "D) Fourth option"],
      "correctAnswer": "B) Second option",
      "explanation": "Detailed explanation why this is correct",
      "pageNumbers": [{pages}],
      "difficulty": "medium",
      "topic": "Main topic name"
    }}
  ],
  "summary": "Brief summary of key concepts covered in these pages for context continuity",
  "topics": ["Topic 1", "Topic 2", "Topic 3"]
}}"#,
        total = mix.total,
        mcq = mix.mcq,
        saq = mix.saq,
        laq = mix.laq,
    )
}

pub fn build_targeted_prompt(context: &str, topic: &str, count: usize) -> String {
    format!(
        r#"Generate {count} quiz questions about "{topic}" based on this context:

{context}

Mix question types (MCQs, SAQs, LAQs) and difficulty levels.

Respond ONLY with a valid JSON array. No markdown, no code blocks.

[
  {{
    "type": "mcq",
    "question": "Question text?",
    "options": ["A) Option 1", "B) Option 2", "C) Option 3", "D) Option 4"],
    "correctAnswer": "A) Option 1",
    "explanation": "Why this is correct",
    "pageNumbers": [],
    "difficulty": "medium",
    "topic": "{topic}"
  }}
]"#
    )
}

pub fn parse_batch_response(
    raw: &str,
    page_numbers: &[u32],
) -> Result<GeneratedBatch, GenerationError> {
    let mut batch: GeneratedBatch = serde_json::from_str(strip_code_fence(raw))?;
    batch.questions = sanitize_questions(batch.questions, page_numbers);
    Ok(batch)
}

pub fn parse_question_list(raw: &str) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    let questions: Vec<GeneratedQuestion> = serde_json::from_str(strip_code_fence(raw))?;
    Ok(sanitize_questions(questions, &[]))
}

fn sanitize_questions(
    questions: Vec<GeneratedQuestion>,
    page_numbers: &[u32],
) -> Vec<GeneratedQuestion> {
    questions
        .into_iter()
        .filter_map(|mut question| {
            if question.kind == QuestionType::Mcq {
                let option_count = question.options.as_ref().map_or(0, Vec::len);
                if option_count != 4 {
                    warn!(
                        question = %question.question,
                        option_count,
                        "dropping multiple choice question without four options"
                    );
                    return None;
                }
            } else {
                question.options = None;
            }

            if question.page_numbers.is_empty() {
                question.page_numbers = page_numbers.to_vec();
            }
            Some(question)
        })
        .collect()
}

pub(crate) fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
