//! Grounded answer synthesis over retrieved chunks.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{LanguageModel, with_deadline};
use crate::error::RagError;
use crate::models::{Answer, RetrievalResult};

/// Bumped whenever the prompt wording changes.
pub const PROMPT_VERSION: u32 = 1;

/// Reply used when nothing relevant was retrieved.
pub const NO_ANSWER: &str = "I don't have information about that in the provided documents.";

/// Fill the version 1 prompt with `context` and `question`.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end.\n\
         If you don't know the answer based on the provided context, just say \"{NO_ANSWER}\"\n\
         Do not make up an answer or use information outside of the provided context.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         Answer:"
    )
}

pub struct Answerer {
    llm: Arc<dyn LanguageModel>,
    timeout: Option<Duration>,
}

impl Answerer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer `question` from `retrieval` alone.
    ///
    /// An empty retrieval short-circuits to [`NO_ANSWER`] without calling the
    /// model.
    pub async fn answer(
        &self,
        question: &str,
        retrieval: &RetrievalResult,
    ) -> Result<Answer, RagError> {
        if retrieval.is_empty() {
            debug!("no context retrieved, returning fallback answer");
            return Ok(Answer {
                text: NO_ANSWER.to_string(),
                used_sources: BTreeSet::new(),
            });
        }

        let context = retrieval
            .iter()
            .map(|scored| scored.entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_prompt(question, &context);

        let start = Instant::now();
        let text = with_deadline(self.timeout, "completion", self.llm.complete(&prompt)).await?;

        info!(
            chunks = retrieval.len(),
            prompt_version = PROMPT_VERSION,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answered"
        );

        Ok(Answer {
            text,
            used_sources: retrieval.source_ids(),
        })
    }
}
