//! Locating model files: a local directory or a Hugging Face Hub repository.

use anyhow::{anyhow, Context, Result};
use hf_hub::api::sync::Api;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Weights {
    SafeTensors(PathBuf),
    Pickle(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: Weights,
}

impl ModelFiles {
    /// `model` is either a directory holding `config.json`, `tokenizer.json` and
    /// weights, or a hub id such as `sentence-transformers/all-MiniLM-L6-v2`.
    pub fn resolve(model: &str) -> Result<Self> {
        let dir = Path::new(model);
        if dir.is_dir() {
            info!("📦 Using local model dir: {}", dir.display());
            return Self::from_dir(dir);
        }
        Self::from_hub(model)
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join("config.json");
        let tokenizer = dir.join("tokenizer.json");
        for required in [&config, &tokenizer] {
            if !required.is_file() {
                return Err(anyhow!("missing {}", required.display()));
            }
        }
        let safetensors = dir.join("model.safetensors");
        let pickle = dir.join("pytorch_model.bin");
        let weights = if safetensors.is_file() {
            Weights::SafeTensors(safetensors)
        } else if pickle.is_file() {
            Weights::Pickle(pickle)
        } else {
            return Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", dir.display()));
        };
        Ok(Self { config, tokenizer, weights })
    }

    fn from_hub(model_id: &str) -> Result<Self> {
        info!("📥 Fetching {} from the Hugging Face Hub", model_id);
        let api = Api::new().context("Failed to create HF API")?;
        let repo = api.model(model_id.to_string());

        debug!("Downloading config...");
        let config = repo.get("config.json").with_context(|| format!("{model_id}: config.json"))?;
        debug!("Downloading tokenizer...");
        let tokenizer = repo.get("tokenizer.json").with_context(|| format!("{model_id}: tokenizer.json"))?;
        debug!("Downloading model weights...");
        let weights = match repo.get("model.safetensors") {
            Ok(path) => Weights::SafeTensors(path),
            Err(_) => Weights::Pickle(repo.get("pytorch_model.bin").with_context(|| format!("{model_id}: weights"))?),
        };
        Ok(Self { config, tokenizer, weights })
    }
}
