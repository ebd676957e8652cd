use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::device::select_device;
use crate::model::{ModelFiles, Weights};
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

/// Longest input the model sees; the rest of a chunk is truncated.
pub const MAX_TOKENS: usize = 256;

/// BERT-family sentence encoder with mean pooling, as used by sentence-transformers.
pub struct SentenceEmbedder {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl SentenceEmbedder {
    pub fn load(model_id: &str) -> Result<Self> {
        let device = select_device();
        let files = ModelFiles::resolve(model_id)?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", files.tokenizer.display(), e))?;

        let raw = std::fs::read_to_string(&files.config).with_context(|| format!("reading {}", files.config.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?["hidden_size"]
            .as_u64()
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| anyhow!("{}: hidden_size missing", files.config.display()))?;

        let vb = match &files.weights {
            // SAFETY: the weights file is only read, and is not modified while mapped.
            Weights::SafeTensors(path) => unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)? },
            Weights::Pickle(path) => {
                let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(path)?.into_iter().collect();
                VarBuilder::from_tensors(weights, DType::F32, &device)
            }
        };
        let model = BertModel::load(vb, &config)?;
        info!("✅ Embedding model {} loaded (dim {})", model_id, dim);
        Ok(Self { model_id: model_id.to_string(), model, tokenizer, device, dim })
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, token_type_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_TOKENS, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis(), "embedded batch");
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dim) {
            warn!("model returned {} values, expected {}", v.len(), self.dim);
            return Err(anyhow!("embedding dimension {} does not match hidden_size {}", v.len(), self.dim));
        }
        Ok(vectors)
    }
}

impl contracts_core::Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> contracts_core::Result<Vec<Vec<f32>>> {
        self.encode(texts).map_err(|e| contracts_core::Error::external("embedding model", format!("{e:#}")))
    }
}
