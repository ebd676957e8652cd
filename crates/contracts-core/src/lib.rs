//! Shared building blocks for the contract RAG workspace: settings, the error
//! model, domain types, engine traits, the PDF loader and the chunker.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use config::Settings;
pub use error::{Error, ErrorKind, Result};
pub use loader::PdfLoader;
pub use traits::{CompletionModel, Embedder, VectorStore};
pub use types::{Chunk, Collection, CollectionStats, Page, Prompt, ScoredChunk};
