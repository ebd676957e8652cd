use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use contracts_core::{CompletionModel, Prompt, Result, ScoredChunk};

use crate::retrieval::RetrievalService;

const INSTRUCTIONS: &str = "Use the following pieces of context to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    /// Chunks the answer was grounded on, best first. Empty when nothing matched.
    pub context: Vec<ScoredChunk>,
}

/// Retrieval followed by a single completion call over the retrieved text.
pub struct RagService {
    retrieval: RetrievalService,
    llm: Arc<dyn CompletionModel>,
}

impl RagService {
    pub fn new(retrieval: RetrievalService, llm: Arc<dyn CompletionModel>) -> Self {
        Self { retrieval, llm }
    }

    pub async fn answer(&self, collection: &str, question: &str, k: Option<usize>) -> Result<RagAnswer> {
        let context = self.retrieval.retrieve(collection, question, k).await?;
        if context.is_empty() {
            warn!(collection, "no context found; asking the model without any");
        }
        let prompt = build_prompt(question, &context);
        info!(model = self.llm.model(), chunks = context.len(), "generating answer");
        let answer = self.llm.complete(&prompt).await?;
        Ok(RagAnswer { answer, context })
    }
}

/// Chunks go into the system message in rank order, separated by blank lines.
pub fn build_prompt(question: &str, context: &[ScoredChunk]) -> Prompt {
    let joined = context.iter().map(|hit| hit.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    Prompt {
        system: format!("{INSTRUCTIONS}\n----------------\n{joined}"),
        user: question.to_string(),
    }
}
