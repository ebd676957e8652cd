//! Wiring of settings, store, embedder and LLM shared by the CLI and the UI.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use contracts_core::{Chunker, CompletionModel, Embedder, Error, Result, Settings, VectorStore};
use contracts_embed::get_default_embedder;
use contracts_vector::LanceVectorStore;

use crate::answer::RagService;
use crate::groq::GroqClient;
use crate::info::CollectionInfo;
use crate::ingest::Ingestor;
use crate::retrieval::RetrievalService;

pub struct Services {
    settings: Settings,
    store: Arc<dyn VectorStore>,
    // loading a model is slow, so it happens on first use only
    embedder: OnceCell<Arc<dyn Embedder>>,
}

impl Services {
    pub fn new(settings: Settings, store: Arc<dyn VectorStore>) -> Self {
        Self { settings, store, embedder: OnceCell::new() }
    }

    /// Open the LanceDB store at `PERSIST_DIR`, creating it if needed.
    pub async fn open(settings: Settings) -> Result<Self> {
        let store = LanceVectorStore::open(&settings.persist_dir).await?;
        Ok(Self::new(settings, Arc::new(store)))
    }

    /// Open the LanceDB store at `PERSIST_DIR`, which must already exist.
    pub async fn open_existing(settings: Settings) -> Result<Self> {
        let store = LanceVectorStore::open_existing(&settings.persist_dir).await?;
        Ok(Self::new(settings, Arc::new(store)))
    }

    /// Use `embedder` instead of loading the configured model.
    pub fn with_embedder(self, embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder: OnceCell::new_with(Some(embedder)), ..self }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    pub async fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        let embedder = self
            .embedder
            .get_or_try_init(|| async {
                let settings = self.settings.clone();
                let loaded = tokio::task::spawn_blocking(move || get_default_embedder(&settings))
                    .await
                    .map_err(|e| Error::external("embedding model", e))??;
                info!(model = loaded.model_id(), dim = loaded.dim(), "embedder ready");
                Ok::<_, Error>(Arc::from(loaded))
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    pub async fn ingestor(&self) -> Result<Ingestor> {
        let chunker = Chunker::from_settings(&self.settings)?;
        let loader = self.settings.loader()?;
        Ok(Ingestor::new(self.store(), self.embedder().await?, chunker, loader))
    }

    pub async fn retrieval(&self) -> Result<RetrievalService> {
        Ok(RetrievalService::new(self.store(), self.embedder().await?, self.settings.top_k))
    }

    /// RAG over Groq. Fails on a missing `GROQ_API_KEY` before touching the store.
    pub async fn rag(&self) -> Result<RagService> {
        let api_key = self.settings.require_groq_api_key()?;
        let llm = GroqClient::new(&self.settings.groq_base_url, api_key, &self.settings.groq_model_name)?;
        self.rag_with(Arc::new(llm)).await
    }

    pub async fn rag_with(&self, llm: Arc<dyn CompletionModel>) -> Result<RagService> {
        Ok(RagService::new(self.retrieval().await?, llm))
    }

    pub async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let stats = self.store.stats(name).await?;
        Ok(CollectionInfo::new(stats, &self.settings.persist_dir))
    }

    pub async fn list_collections(&self) -> Result<Vec<contracts_core::CollectionStats>> {
        self.store.list_collections().await
    }
}
