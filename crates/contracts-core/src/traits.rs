use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Chunk, Collection, CollectionStats, Prompt, ScoredChunk};

/// Maps text to fixed-length vectors. Implementations must return vectors of
/// length `dim()` for every input.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, recorded alongside each collection.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::external("embedding model", "no vector returned"))
    }
}

/// Named collections of (chunk, vector) pairs with top-k similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open `name`, creating it when absent. Fails with `DimensionMismatch`
    /// when the stored collection was created with another dimension.
    async fn open_or_create(&self, name: &str, dimension: usize) -> Result<Collection>;

    /// Open an existing collection; `CollectionNotFound` otherwise.
    async fn open(&self, name: &str) -> Result<Collection>;

    /// Remove a collection and its data. Returns whether it existed.
    async fn drop_collection(&self, name: &str) -> Result<bool>;

    /// Append chunks with their vectors. Validation happens before any write.
    async fn upsert(&self, collection: &Collection, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize>;

    /// At most `k` nearest chunks, best first. Never fails on small collections.
    async fn query(&self, collection: &Collection, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn stats(&self, name: &str) -> Result<CollectionStats>;

    async fn list_collections(&self) -> Result<Vec<CollectionStats>>;

    async fn record_model(&self, name: &str, model_id: &str) -> Result<()>;

    async fn model_for(&self, name: &str) -> Result<Option<String>>;
}

/// A hosted or local text completion endpoint.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}
