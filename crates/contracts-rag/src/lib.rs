//! Ingestion, retrieval and retrieval-augmented answering over contract PDFs.

pub mod answer;
pub mod groq;
pub mod info;
pub mod ingest;
pub mod retrieval;
pub mod services;

pub use answer::{build_prompt, RagAnswer, RagService};
pub use groq::GroqClient;
pub use info::{directory_size, format_size, CollectionInfo};
pub use ingest::{IngestMode, IngestReport, Ingestor, EMBED_BATCH};
pub use retrieval::{snippet, RetrievalService, Retrieved, SNIPPET_CHARS};
pub use services::Services;
