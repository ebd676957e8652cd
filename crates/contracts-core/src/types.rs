//! Domain types shared by the loader, chunker, embedders and vector stores.

use serde::{Deserialize, Serialize};

/// One page of extracted PDF text. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// A bounded span of document text, the unit of embedding and retrieval.
///
/// - `id`: `"{source}:{chunk_index}"`, not unique across repeated appends
/// - `source`: file name of the originating PDF
/// - `page`: page the window was cut from
/// - `chunk_index`: position within the document, used for ordering only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
}

impl Chunk {
    pub fn new(source: &str, page: u32, chunk_index: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("{source}:{chunk_index}"),
            text: text.into(),
            source: source.to_string(),
            page,
            chunk_index,
        }
    }
}

/// Handle on a named collection. All vectors stored in it have `dimension` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub dimension: usize,
}

/// A query hit. `score` is `1 - cosine distance`; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Summary of one stored collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub count: usize,
    pub dimension: usize,
    pub model: Option<String>,
    pub sample_sources: Vec<String>,
}

/// A chat-style prompt for a completion model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}
