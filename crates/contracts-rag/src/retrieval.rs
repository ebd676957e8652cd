use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use contracts_core::{Embedder, Error, Result, ScoredChunk, VectorStore};

/// Displayed chunk text is cut to this many characters.
pub const SNIPPET_CHARS: usize = 800;

/// Embeds a question and returns the nearest chunks of one collection.
#[derive(Clone)]
pub struct RetrievalService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    default_k: usize,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, default_k: usize) -> Self {
        Self { store, embedder, default_k }
    }

    /// Top `k` (default `TOP_K`) chunks, best first. A collection that does not
    /// exist yields an empty result and a warning.
    pub async fn retrieve(&self, collection: &str, query: &str, k: Option<usize>) -> Result<Vec<ScoredChunk>> {
        let k = k.unwrap_or(self.default_k);
        let coll = match self.store.open(collection).await {
            Ok(coll) => coll,
            Err(Error::CollectionNotFound(name)) => {
                warn!(collection = %name, "collection not found; returning no results");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        if let Some(model) = self.store.model_for(collection).await? {
            if model != self.embedder.model_id() {
                warn!(collection, stored = %model, current = self.embedder.model_id(), "collection was embedded with a different model");
            }
        }
        let vector = self.embedder.embed(query)?;
        let hits = self.store.query(&coll, &vector, k).await?;
        debug!(collection, k, hits = hits.len(), "retrieved");
        Ok(hits)
    }
}

/// One result row as shown by the CLI and UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieved {
    pub rank: usize,
    pub score: f32,
    pub source: String,
    pub page: u32,
    pub snippet: String,
}

impl Retrieved {
    pub fn rows(hits: &[ScoredChunk]) -> Vec<Self> {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| Self {
                rank: i + 1,
                score: hit.score,
                source: hit.chunk.source.clone(),
                page: hit.chunk.page,
                snippet: snippet(&hit.chunk.text),
            })
            .collect()
    }
}

/// Trimmed text, cut to [`SNIPPET_CHARS`] characters with `...` appended when
/// it is at least that long.
pub fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() < SNIPPET_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(SNIPPET_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_kept_whole() {
        assert_eq!(snippet("  net 30 days \n"), "net 30 days");
    }

    #[test]
    fn long_text_is_cut_at_the_limit() {
        let text = "é".repeat(900);
        let s = snippet(&text);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
    }
}
