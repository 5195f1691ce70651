//! Whole-index snapshot persistence.
//!
//! Layout of one snapshot file:
//!
//! ```text
//! "RAGX" | header_len: u32 LE | header JSON | vectors: f32 LE, chunk-major
//! ```
//!
//! The header carries the schema version, the embedding model id, the
//! dimension and every chunk's metadata. Files are written to a temp path
//! and renamed into place.

use crate::error::{Result, VectorStoreError};
use crate::index::EmbeddingIndex;
use crate::lock::{acquire_snapshot_lock, sibling_path};
use advisor_text_chunker::Chunk;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

const SNAPSHOT_MAGIC: &[u8; 4] = b"RAGX";
const PREAMBLE_LEN: usize = 8;

#[derive(Serialize)]
struct SnapshotHeaderRef<'a> {
    schema_version: u32,
    model_id: &'a str,
    dimension: usize,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct SnapshotHeader {
    schema_version: u32,
    model_id: String,
    dimension: usize,
    chunks: Vec<Chunk>,
}

/// On-disk home of one index
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write the full index, replacing any previous snapshot atomically.
    pub async fn save(&self, index: &EmbeddingIndex) -> Result<()> {
        log::info!("Saving index snapshot to {:?}", self.path);
        let _lock = acquire_snapshot_lock(&self.path).await?;

        let bytes = encode_snapshot(index)?;
        let tmp = sibling_path(&self.path, "tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        log::info!(
            "Index snapshot saved ({} chunks, {} bytes)",
            index.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Read the snapshot back.
    ///
    /// Missing or corrupt snapshots yield `Ok(None)` so the caller can
    /// rebuild; a snapshot embedded with another model is an error.
    pub async fn load(&self, active_model_id: &str) -> Result<Option<EmbeddingIndex>> {
        log::info!("Loading index snapshot from {:?}", self.path);
        let _lock = acquire_snapshot_lock(&self.path).await?;

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No index snapshot at {:?}", self.path);
                return Ok(None);
            }
            Err(err) => {
                log::warn!("Unreadable index snapshot {:?}: {err}", self.path);
                return Ok(None);
            }
        };

        let (header, vectors) = match decode_snapshot(&bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("Ignoring corrupt index snapshot {:?}: {err}", self.path);
                return Ok(None);
            }
        };

        if header.model_id != active_model_id {
            return Err(VectorStoreError::ModelMismatch {
                stored: header.model_id,
                active: active_model_id.to_string(),
            });
        }

        match EmbeddingIndex::from_parts(header.model_id, header.dimension, header.chunks, vectors)
        {
            Ok(index) => {
                log::info!("Loaded {} chunks", index.len());
                Ok(Some(index))
            }
            Err(err) => {
                log::warn!("Ignoring inconsistent index snapshot {:?}: {err}", self.path);
                Ok(None)
            }
        }
    }
}

fn encode_snapshot(index: &EmbeddingIndex) -> Result<Vec<u8>> {
    let header = serde_json::to_vec(&SnapshotHeaderRef {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        model_id: index.model_id(),
        dimension: index.dimension(),
        chunks: index.chunks(),
    })?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| VectorStoreError::CorruptSnapshot("header exceeds 4 GiB".to_string()))?;

    let vector_bytes = index.len() * index.dimension() * 4;
    let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len() + vector_bytes);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header);
    for record in index.records() {
        for value in record.vector {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(out)
}

fn decode_snapshot(bytes: &[u8]) -> std::result::Result<(SnapshotHeader, Vec<Vec<f32>>), String> {
    if bytes.len() < PREAMBLE_LEN || &bytes[0..4] != SNAPSHOT_MAGIC {
        return Err("bad magic".to_string());
    }
    let header_len = u32::from_le_bytes(
        bytes[4..8]
            .try_into()
            .map_err(|_| "truncated preamble".to_string())?,
    ) as usize;
    let header_end = PREAMBLE_LEN
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| "truncated header".to_string())?;

    let header: SnapshotHeader = serde_json::from_slice(&bytes[PREAMBLE_LEN..header_end])
        .map_err(|err| format!("header: {err}"))?;
    if header.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(format!(
            "unsupported schema_version {} (expected {SNAPSHOT_SCHEMA_VERSION})",
            header.schema_version
        ));
    }

    let body = &bytes[header_end..];
    let expected = header
        .chunks
        .len()
        .checked_mul(header.dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "vector block size overflow".to_string())?;
    if body.len() != expected {
        return Err(format!(
            "vector block is {} bytes, expected {expected}",
            body.len()
        ));
    }

    let vectors = if header.dimension == 0 {
        vec![Vec::new(); header.chunks.len()]
    } else {
        body.chunks_exact(header.dimension * 4)
            .map(|row| {
                row.chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect()
            })
            .collect()
    };

    Ok((header, vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, StubEmbedder};
    use crate::provider::CallPolicy;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn build_index(stub: &StubEmbedder) -> EmbeddingIndex {
        let mut index = EmbeddingIndex::for_provider(stub);
        let chunks = vec![
            Chunk::new("credit-card-kb", 0, 0, "Citi Rewards earns 4 mpd on dining".into()),
            Chunk::new("credit-card-kb", 1, 0, "DBS Woman's World earns 4 mpd online".into()),
            Chunk::new("guide.txt", 0, 0, "Amaze wallet pairs with Citi Rewards".into())
                .with_page(Some(2)),
        ];
        index
            .add(chunks, stub, &CallPolicy::default(), 8)
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_search_results() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("index.ragx"));
        let stub = StubEmbedder::new("v1", 32);
        let index = build_index(&stub).await;

        store.save(&index).await.unwrap();
        let loaded = store.load(stub.model_id()).await.unwrap().expect("snapshot");

        assert_eq!(loaded.chunks(), index.chunks());
        assert_eq!(loaded.next_sequence_index("credit-card-kb"), 2);
        for query in ["dining card", "online shopping", "wallet"] {
            let vector = stub.embed(query).await.unwrap();
            assert_eq!(
                loaded.search(&vector, 3).unwrap(),
                index.search(&vector, 3).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("nested/index.ragx"));
        assert!(store.load("stub/v1/32").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.ragx");
        let store = SnapshotStore::new(&path);
        let stub = StubEmbedder::new("v1", 32);
        store.save(&build_index(&stub).await).await.unwrap();

        let bytes = tokio::fs::read(&path).await.unwrap();
        tokio::fs::write(&path, &bytes[..bytes.len() - 3]).await.unwrap();
        assert!(store.load(stub.model_id()).await.unwrap().is_none());

        tokio::fs::write(&path, b"not a snapshot").await.unwrap();
        assert!(store.load(stub.model_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_model_mismatch_is_consistency_error() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("index.ragx"));
        let version_a = StubEmbedder::new("a", 32);
        let version_b = StubEmbedder::new("b", 32);
        store.save(&build_index(&version_a).await).await.unwrap();

        let err = store.load(version_b.model_id()).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::ModelMismatch { ref stored, ref active }
                if stored == "stub/a/32" && active == "stub/b/32"
        ));
    }

    #[tokio::test]
    async fn test_empty_index_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("index.ragx"));
        let index = EmbeddingIndex::new("stub/v1/4", 4);
        store.save(&index).await.unwrap();

        let loaded = store.load("stub/v1/4").await.unwrap().expect("snapshot");
        assert!(loaded.is_empty());
        assert!(!tmp.path().join("index.ragx.tmp").exists());
    }
}
