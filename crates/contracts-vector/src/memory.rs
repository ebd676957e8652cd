//! In-memory vector store using cosine similarity.
//!
//! Backed by a `HashMap` behind a `tokio::sync::RwLock`; used by tests and by
//! callers that do not need persistence.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use contracts_core::{Chunk, Collection, CollectionStats, Error, Result, ScoredChunk, VectorStore};

#[derive(Debug)]
struct Entry {
    dimension: usize,
    rows: Vec<(Chunk, Vec<f32>)>,
    model: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Entry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn stats_of(name: &str, entry: &Entry) -> CollectionStats {
    let mut seen = BTreeSet::new();
    let sample_sources = entry
        .rows
        .iter()
        .map(|(c, _)| c.source.clone())
        .filter(|s| seen.insert(s.clone()))
        .take(3)
        .collect();
    CollectionStats {
        name: name.to_string(),
        count: entry.rows.len(),
        dimension: entry.dimension,
        model: entry.model.clone(),
        sample_sources,
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn open_or_create(&self, name: &str, dimension: usize) -> Result<Collection> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(name.to_string())
            .or_insert_with(|| Entry { dimension, rows: Vec::new(), model: None });
        if entry.dimension != dimension {
            return Err(Error::DimensionMismatch { collection: name.to_string(), expected: entry.dimension, actual: dimension });
        }
        Ok(Collection { name: name.to_string(), dimension })
    }

    async fn open(&self, name: &str) -> Result<Collection> {
        let collections = self.collections.read().await;
        let entry = collections.get(name).ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        Ok(Collection { name: name.to_string(), dimension: entry.dimension })
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    async fn upsert(&self, collection: &Collection, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(Error::Store(format!("{} chunks but {} vectors", chunks.len(), vectors.len())));
        }
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(&collection.name)
            .ok_or_else(|| Error::CollectionNotFound(collection.name.clone()))?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != entry.dimension) {
            return Err(Error::DimensionMismatch { collection: collection.name.clone(), expected: entry.dimension, actual: bad.len() });
        }
        entry.rows.extend(chunks.iter().cloned().zip(vectors.iter().cloned()));
        Ok(chunks.len())
    }

    async fn query(&self, collection: &Collection, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be greater than zero".to_string()));
        }
        let collections = self.collections.read().await;
        let entry = collections
            .get(&collection.name)
            .ok_or_else(|| Error::CollectionNotFound(collection.name.clone()))?;
        if vector.len() != entry.dimension {
            return Err(Error::DimensionMismatch { collection: collection.name.clone(), expected: entry.dimension, actual: vector.len() });
        }

        let mut scored: Vec<ScoredChunk> = entry
            .rows
            .iter()
            .map(|(chunk, v)| ScoredChunk { chunk: chunk.clone(), score: cosine_similarity(v, vector) })
            .collect();
        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn stats(&self, name: &str) -> Result<CollectionStats> {
        let collections = self.collections.read().await;
        let entry = collections.get(name).ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        Ok(stats_of(name, entry))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionStats>> {
        let collections = self.collections.read().await;
        let mut out: Vec<CollectionStats> = collections.iter().map(|(name, entry)| stats_of(name, entry)).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn record_model(&self, name: &str, model_id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.get_mut(name).ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        entry.model = Some(model_id.to_string());
        Ok(())
    }

    async fn model_for(&self, name: &str) -> Result<Option<String>> {
        Ok(self.collections.read().await.get(name).and_then(|e| e.model.clone()))
    }
}
