//! PDF → pages → chunks → embeddings → collection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use contracts_core::{Chunk, Chunker, Embedder, Error, Page, PdfLoader, Result, VectorStore};

/// Chunks embedded and written per round trip.
pub const EMBED_BATCH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Add to the collection, creating it if absent. Re-ingesting the same PDF
    /// stores its chunks twice.
    Append,
    /// Drop the collection first so it holds exactly this PDF.
    Rebuild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub source: String,
    pub mode: IngestMode,
    pub pages: usize,
    pub chunks: usize,
}

pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    loader: PdfLoader,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, chunker: Chunker, loader: PdfLoader) -> Self {
        Self { store, embedder, chunker, loader, show_progress: false }
    }

    /// Draw a progress bar on stderr while embedding.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn ingest(&self, path: &Path, collection: &str, mode: IngestMode) -> Result<IngestReport> {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::Ingestion(format!("not a file path: {}", path.display())))?;
        self.ingest_as(path, &source, collection, mode).await
    }

    /// Like [`Ingestor::ingest`], labelling chunks with `source` instead of the
    /// file name, for uploads stored under a temporary name.
    pub async fn ingest_as(&self, path: &Path, source: &str, collection: &str, mode: IngestMode) -> Result<IngestReport> {
        info!(path = %path.display(), collection, ?mode, loader = %self.loader, "ingesting PDF");
        let loader = self.loader;
        let owned: PathBuf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|e| Error::Ingestion(format!("PDF loader task failed: {e}")))??;
        self.ingest_pages(source, &pages, collection, mode).await
    }

    pub async fn ingest_pages(&self, source: &str, pages: &[Page], collection: &str, mode: IngestMode) -> Result<IngestReport> {
        if mode == IngestMode::Rebuild && self.store.drop_collection(collection).await? {
            info!(collection, "dropped existing collection for rebuild");
        }
        let coll = self.store.open_or_create(collection, self.embedder.dim()).await?;

        if mode == IngestMode::Append {
            if let Some(previous) = self.store.model_for(collection).await? {
                if previous != self.embedder.model_id() {
                    warn!(collection, previous = %previous, current = self.embedder.model_id(), "collection was built with a different embedding model");
                }
            }
        }

        let chunks: Vec<Chunk> = self.chunker.chunk_pages(source, pages).collect();
        if chunks.is_empty() {
            warn!(source, "no extractable text; nothing stored");
        }

        let pb = self.progress_bar(chunks.len());
        let mut stored = 0usize;
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            stored += self.store.upsert(&coll, batch, &vectors).await?;
            debug!(stored, total = chunks.len(), "stored batch");
            if let Some(pb) = &pb { pb.inc(batch.len() as u64); }
        }
        if let Some(pb) = pb { pb.finish_with_message("✅ embedded"); }

        self.store.record_model(collection, self.embedder.model_id()).await?;
        info!(collection, pages = pages.len(), chunks = stored, "📊 ingestion complete");
        Ok(IngestReport { collection: collection.to_string(), source: source.to_string(), mode, pages: pages.len(), chunks: stored })
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.show_progress || len == 0 {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("#>-"));
        pb.set_style(style);
        Some(pb)
    }
}
