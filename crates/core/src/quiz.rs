use crate::batching::{batch_text, group_into_batches, page_numbers};
use crate::generation::{
    build_batch_prompt, build_targeted_prompt, parse_batch_response, parse_question_list,
    GeneratedBatch, QuestionMix,
};
use crate::models::{
    BatchQuizResult, Page, QuestionBreakdown, QuizOptions, QuizQuestion, QuizReport,
};
use crate::traits::TextGenerator;
use crate::{GenerationError, IngestError};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub struct QuizGenerator<G>
where
    G: TextGenerator,
{
    generator: Arc<G>,
    options: QuizOptions,
}

#[derive(Debug, Default, Clone)]
pub struct QuizRunState {
    pub questions: Vec<QuizQuestion>,
    pub carry_summary: String,
    pub batch_index: usize,
    pub skipped_batches: Vec<usize>,
    issued_ids: HashSet<String>,
}

impl QuizRunState {
    /// Applies one batch outcome. A failed batch adds nothing and leaves the
    /// carried summary as the last successful batch left it.
    pub fn advance(
        mut self,
        first_page: u32,
        outcome: Result<GeneratedBatch, GenerationError>,
        timestamp_millis: i64,
    ) -> Self {
        match outcome {
            Ok(batch) => {
                let result = self.assign_ids(first_page, batch, timestamp_millis);
                self.questions.extend(result.questions);
                self.carry_summary = result.summary;
            }
            Err(error) => {
                warn!(batch = self.batch_index + 1, first_page, %error, "skipping batch");
                self.skipped_batches.push(self.batch_index);
            }
        }
        self.batch_index += 1;
        self
    }

    fn assign_ids(
        &mut self,
        first_page: u32,
        batch: GeneratedBatch,
        timestamp_millis: i64,
    ) -> BatchQuizResult {
        let questions = batch
            .questions
            .into_iter()
            .enumerate()
            .map(|(sequence, generated)| {
                let id = self.unique_id(format!(
                    "q_{first_page}_{}_{timestamp_millis}",
                    sequence + 1
                ));
                generated.into_question(id)
            })
            .collect();

        BatchQuizResult {
            questions,
            summary: batch.summary,
            topics: batch.topics,
        }
    }

    fn unique_id(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut suffix = self.batch_index;
        while self.issued_ids.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.issued_ids.insert(candidate.clone());
        candidate
    }

    pub fn into_report(self, total_pages: usize) -> QuizReport {
        QuizReport {
            total_questions: self.questions.len(),
            total_pages,
            batches_processed: self.batch_index,
            breakdown: QuestionBreakdown::from_questions(&self.questions),
            questions: self.questions,
        }
    }
}

impl<G> QuizGenerator<G>
where
    G: TextGenerator,
{
    pub fn new(generator: Arc<G>, options: QuizOptions) -> Self {
        Self { generator, options }
    }

    pub fn options(&self) -> &QuizOptions {
        &self.options
    }

    pub async fn generate(&self, pages: &[Page]) -> Result<QuizReport, IngestError> {
        if self.options.questions_per_page == 0 {
            return Err(IngestError::InvalidArgument(
                "questions per page must be at least 1".to_string(),
            ));
        }

        let batches = group_into_batches(pages, self.options.batch_size)?;
        info!(
            pages = pages.len(),
            batches = batches.len(),
            batch_size = self.options.batch_size,
            questions_per_page = self.options.questions_per_page,
            "starting quiz generation"
        );

        let mut state = QuizRunState::default();
        for (index, batch) in batches.iter().enumerate() {
            let first_page = batch.first().map_or(0, |page| page.page_number);
            let outcome = self.run_batch(batch, &state.carry_summary).await;
            if let Ok(result) = &outcome {
                info!(
                    batch = index + 1,
                    of = batches.len(),
                    questions = result.questions.len(),
                    progress = ((index + 1) * 100) / batches.len(),
                    "batch complete"
                );
            }
            state = state.advance(first_page, outcome, Utc::now().timestamp_millis());

            if index + 1 < batches.len() && !self.options.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.options.inter_batch_delay).await;
            }
        }

        if !state.skipped_batches.is_empty() {
            warn!(
                skipped = state.skipped_batches.len(),
                "quiz generated with skipped batches"
            );
        }

        Ok(state.into_report(pages.len()))
    }

    async fn run_batch(
        &self,
        batch: &[Page],
        carry_summary: &str,
    ) -> Result<GeneratedBatch, GenerationError> {
        let numbers = page_numbers(batch);
        let mix = QuestionMix::for_pages(batch.len(), self.options.questions_per_page);
        let prompt = build_batch_prompt(&batch_text(batch), &numbers, carry_summary, mix);

        let raw = self.generator.generate(&prompt).await?;
        parse_batch_response(&raw, &numbers)
    }

    pub async fn generate_targeted_questions(
        &self,
        context: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        let prompt = build_targeted_prompt(context, topic, count);
        let raw = self.generator.generate(&prompt).await?;
        let timestamp = Utc::now().timestamp_millis();

        Ok(parse_question_list(&raw)?
            .into_iter()
            .enumerate()
            .map(|(sequence, question)| {
                question.into_question(format!("q_targeted_{}_{timestamp}", sequence + 1))
            })
            .collect())
    }
}
