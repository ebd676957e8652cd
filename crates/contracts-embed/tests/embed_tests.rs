use contracts_core::{Embedder, Error, Settings};
use contracts_embed::{get_default_embedder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = Settings { use_fake_embeddings: true, ..Settings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");
    assert_eq!(embedder.dim(), 384);
    assert_eq!(embedder.model_id(), "fake:d384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_score_higher_than_unrelated_text() {
    let embedder = FakeEmbedder::default();
    let query = embedder.embed("payment terms").unwrap();
    let related = embedder.embed("The payment terms are net 30 days").unwrap();
    let unrelated = embedder.embed("Either party may terminate on notice").unwrap();
    assert!(cosine(&query, &related) > cosine(&query, &unrelated));
}

#[test]
fn empty_batch_gives_no_vectors() {
    let embedder = FakeEmbedder::new(16);
    assert!(embedder.embed_batch(&[]).unwrap().is_empty());
}

#[test]
fn missing_local_model_dir_is_an_external_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = Settings { model_name: tmp.path().to_string_lossy().to_string(), ..Settings::default() };
    let err = get_default_embedder(&settings).err().expect("no model files");
    assert!(matches!(err, Error::ExternalService { .. }), "{err}");
}
