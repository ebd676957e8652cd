//! Text embedding: a candle BERT sentence encoder and a hashing fake.
//!
//! `Settings::use_fake_embeddings` (`APP_USE_FAKE_EMBEDDINGS=1`) swaps in the
//! FakeEmbedder so tests and development never download a model.

pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod sentence;
pub mod tokenize;

use contracts_core::{Embedder, Error, Result, Settings};
use tracing::info;

pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;
pub use sentence::SentenceEmbedder;

/// Dimension of the fake embedder, matching all-MiniLM-L6-v2.
pub const FAKE_DIM: usize = 384;

pub fn get_default_embedder(settings: &Settings) -> Result<Box<dyn Embedder>> {
    if settings.use_fake_embeddings {
        info!("🧪 Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(FAKE_DIM)));
    }
    let model = SentenceEmbedder::load(&settings.model_name)
        .map_err(|e| Error::external("embedding model", format!("{}: {e:#}", settings.model_name)))?;
    Ok(Box::new(model))
}
