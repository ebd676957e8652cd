//! LanceDB-backed [`VectorStore`]: one table per collection under the persist directory.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info};

use contracts_core::{Chunk, Collection, CollectionStats, Error, Result, ScoredChunk, VectorStore};

use crate::schema::{chunk_schema, vector_dimension};
use crate::table::{delete_meta, ensure_table, get_meta, open_db, set_meta, table_exists, META_TABLE};

const SAMPLE_SOURCES: usize = 3;
const SAMPLE_ROWS: usize = 256;

pub struct LanceVectorStore {
    conn: Connection,
}

impl LanceVectorStore {
    /// Open the store at `root`, creating the directory if needed.
    pub async fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Self::connect(root).await
    }

    /// Open the store at `root`, which must already exist. Query paths use this
    /// so a mistyped `PERSIST_DIR` is reported rather than silently created.
    pub async fn open_existing(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "persist directory {} does not exist; ingest a PDF first",
                root.display()
            )));
        }
        Self::connect(root).await
    }

    async fn connect(root: &Path) -> Result<Self> {
        let conn = open_db(&root.to_string_lossy()).await.map_err(store_err)?;
        Ok(Self { conn })
    }

    async fn open_table(&self, name: &str) -> Result<Table> {
        validate_name(name)?;
        if !table_exists(&self.conn, name).await.map_err(store_err)? {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        self.conn.open_table(name).execute().await.map_err(Error::store)
    }

    async fn collection_of(name: &str, table: &Table) -> Result<Collection> {
        let schema = table.schema().await.map_err(Error::store)?;
        let dimension = vector_dimension(&schema)
            .ok_or_else(|| Error::Store(format!("collection '{name}' has no vector column")))?;
        Ok(Collection { name: name.to_string(), dimension })
    }

    async fn sample_sources(table: &Table) -> Result<Vec<String>> {
        let mut stream = table
            .query()
            .select(Select::columns(&["source"]))
            .limit(SAMPLE_ROWS)
            .execute()
            .await
            .map_err(Error::store)?;
        let mut seen = BTreeSet::new();
        let mut sources = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
            let col = string_column(&batch, "source")?;
            for i in 0..batch.num_rows() {
                let source = col.value(i);
                if seen.insert(source.to_string()) {
                    sources.push(source.to_string());
                    if sources.len() == SAMPLE_SOURCES {
                        return Ok(sources);
                    }
                }
            }
        }
        Ok(sources)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn open_or_create(&self, name: &str, dimension: usize) -> Result<Collection> {
        validate_name(name)?;
        let conn = &self.conn;
        if table_exists(conn, name).await.map_err(store_err)? {
            let table = conn.open_table(name).execute().await.map_err(Error::store)?;
            let collection = Self::collection_of(name, &table).await?;
            if collection.dimension != dimension {
                return Err(Error::DimensionMismatch {
                    collection: name.to_string(),
                    expected: collection.dimension,
                    actual: dimension,
                });
            }
            return Ok(collection);
        }
        let width = i32::try_from(dimension).map_err(|_| Error::Store(format!("dimension {dimension} too large")))?;
        ensure_table(conn, name, chunk_schema(width)).await.map_err(store_err)?;
        info!(collection = name, dimension, "created collection");
        Ok(Collection { name: name.to_string(), dimension })
    }

    async fn open(&self, name: &str) -> Result<Collection> {
        let table = self.open_table(name).await?;
        Self::collection_of(name, &table).await
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        if !table_exists(&self.conn, name).await.map_err(store_err)? {
            return Ok(false);
        }
        self.conn.drop_table(name, &[]).await.map_err(Error::store)?;
        delete_meta(&self.conn, &model_key(name)).await.map_err(store_err)?;
        info!(collection = name, "dropped collection");
        Ok(true)
    }

    async fn upsert(&self, collection: &Collection, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(Error::Store(format!("{} chunks but {} vectors", chunks.len(), vectors.len())));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != collection.dimension) {
            return Err(Error::DimensionMismatch {
                collection: collection.name.clone(),
                expected: collection.dimension,
                actual: bad.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(0);
        }
        let table = self.open_table(&collection.name).await?;
        let batch = chunks_to_record_batch(collection.dimension, chunks, vectors)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        table.add(reader).execute().await.map_err(Error::store)?;
        debug!(collection = %collection.name, rows = chunks.len(), "appended chunks");
        Ok(chunks.len())
    }

    async fn query(&self, collection: &Collection, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be greater than zero".to_string()));
        }
        if vector.len() != collection.dimension {
            return Err(Error::DimensionMismatch {
                collection: collection.name.clone(),
                expected: collection.dimension,
                actual: vector.len(),
            });
        }
        let table = self.open_table(&collection.name).await?;
        // an empty table has no vectors to search against
        if table.count_rows(None).await.map_err(Error::store)? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(Error::store)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(Error::store)?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
            hits.extend(scored_chunks(&batch)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn stats(&self, name: &str) -> Result<CollectionStats> {
        let table = self.open_table(name).await?;
        let collection = Self::collection_of(name, &table).await?;
        let count = table.count_rows(None).await.map_err(Error::store)?;
        let sample_sources = Self::sample_sources(&table).await?;
        let model = self.model_for(name).await?;
        Ok(CollectionStats { name: collection.name, count, dimension: collection.dimension, model, sample_sources })
    }

    async fn list_collections(&self) -> Result<Vec<CollectionStats>> {
        let mut names = self.conn.table_names().execute().await.map_err(Error::store)?;
        names.retain(|n| n != META_TABLE);
        names.sort();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.stats(&name).await?);
        }
        Ok(out)
    }

    async fn record_model(&self, name: &str, model_id: &str) -> Result<()> {
        set_meta(&self.conn, &model_key(name), model_id).await.map_err(store_err)
    }

    async fn model_for(&self, name: &str) -> Result<Option<String>> {
        get_meta(&self.conn, &model_key(name)).await.map_err(store_err)
    }
}

fn model_key(collection: &str) -> String {
    format!("model:{collection}")
}

fn store_err(e: anyhow::Error) -> Error {
    Error::Store(format!("{e:#}"))
}

/// Names become directory names under the persist dir, so keep them to `[A-Za-z0-9_.-]`.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name != META_TABLE
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::Store(format!("invalid collection name '{name}'")))
    }
}

fn chunks_to_record_batch(dim: usize, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
    let width = i32::try_from(dim).map_err(|_| Error::Store(format!("dimension {dim} too large")))?;
    let mut ids = Vec::with_capacity(chunks.len());
    let mut sources = Vec::with_capacity(chunks.len());
    let mut pages = Vec::with_capacity(chunks.len());
    let mut indices = Vec::with_capacity(chunks.len());
    let mut texts = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        ids.push(chunk.id.as_str());
        sources.push(chunk.source.as_str());
        pages.push(i32::try_from(chunk.page).map_err(Error::store)?);
        indices.push(i32::try_from(chunk.chunk_index).map_err(Error::store)?);
        texts.push(chunk.text.as_str());
    }
    let vectors = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
    RecordBatch::try_new(chunk_schema(width), vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(sources)),
        Arc::new(Int32Array::from(pages)),
        Arc::new(Int32Array::from(indices)),
        Arc::new(StringArray::from(texts)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, width)),
    ])
    .map_err(Error::store)
}

fn scored_chunks(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
    let ids = string_column(batch, "id")?;
    let sources = string_column(batch, "source")?;
    let texts = string_column(batch, "text")?;
    let pages = int_column(batch, "page")?;
    let indices = int_column(batch, "chunk_index")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::Store("search result has no _distance column".to_string()))?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let chunk = Chunk {
            id: ids.value(i).to_string(),
            text: texts.value(i).to_string(),
            source: sources.value(i).to_string(),
            page: u32::try_from(pages.value(i)).unwrap_or_default(),
            chunk_index: usize::try_from(indices.value(i)).unwrap_or_default(),
        };
        let score = if distances.is_null(i) { 0.0 } else { 1.0 - distances.value(i) };
        out.push(ScoredChunk { chunk, score });
    }
    Ok(out)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Store(format!("{name} column missing")))
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| Error::Store(format!("{name} column missing")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_restricted_to_path_safe_characters() {
        assert!(validate_name("Construction_Agreement-v2.1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name(META_TABLE).is_err());
    }

    #[test]
    fn record_batch_matches_schema_width() {
        let chunks = vec![Chunk::new("a.pdf", 1, 0, "alpha"), Chunk::new("a.pdf", 2, 1, "beta")];
        let vectors = vec![vec![0.1, 0.2, 0.3], vec![0.3, 0.2, 0.1]];
        let batch = chunks_to_record_batch(3, &chunks, &vectors).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(vector_dimension(&batch.schema()), Some(3));
        assert_eq!(string_column(&batch, "id").unwrap().value(1), "a.pdf:1");
    }
}
