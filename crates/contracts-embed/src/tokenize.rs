use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Token ids, type ids and attention mask for a batch, each `[B,T]` where `T`
/// is the longest encoding capped at `max_len`. Shorter rows are padded with id 0.
/// The mask is the tokenizer's own, so padding configured in `tokenizer.json`
/// stays masked out.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let width = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0).clamp(1, max_len);

    let mut ids = Vec::with_capacity(texts.len() * width);
    let mut mask = Vec::with_capacity(texts.len() * width);
    for enc in &encodings {
        let row = enc.get_ids();
        let len = row.len().min(width);
        ids.extend_from_slice(&row[..len]);
        mask.extend_from_slice(&enc.get_attention_mask()[..len]);
        ids.extend(std::iter::repeat(0u32).take(width - len));
        mask.extend(std::iter::repeat(0u32).take(width - len));
    }

    let shape = (encodings.len(), width);
    let input_ids = Tensor::from_vec(ids, shape, device)?;
    let attention_mask = Tensor::from_vec(mask, shape, device)?;
    let token_type_ids = input_ids.zeros_like()?;
    Ok((input_ids, token_type_ids, attention_mask))
}
