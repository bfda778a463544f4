//! Key/value backing for managed environments where the local disk is not
//! writable. Content is zlib-compressed; large values are split into chunks.

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use moka::future::Cache;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Largest value written under a single key
pub const CHUNK_SIZE: usize = 1_000_000;

const ZLIB_PREFIX: &[u8] = b"zlib:";
const CHUNKS_PREFIX: &[u8] = b"chunks:";

/// External key/value store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-process store backed by moka
pub struct MemoryStore {
    cache: Cache<String, Arc<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(24 * 3600))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|v| v.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.cache.insert(key.to_string(), Arc::new(value)).await;
        Ok(())
    }
}

/// Compress `content` and write it under `url`, chunking when needed
pub async fn store_content(store: &dyn RemoteStore, url: &str, content: &[u8]) -> Result<()> {
    let compressed = compress(url, content)?;
    if compressed.len() <= CHUNK_SIZE {
        let mut value = ZLIB_PREFIX.to_vec();
        value.extend_from_slice(&compressed);
        return store.set(url, value).await;
    }

    let chunks: Vec<&[u8]> = compressed.chunks(CHUNK_SIZE).collect();
    for (index, chunk) in chunks.iter().enumerate() {
        store.set(&chunk_key(url, index), chunk.to_vec()).await?;
    }
    debug!(url, chunks = chunks.len(), "stored chunked content");
    store
        .set(url, format!("chunks:{}", chunks.len()).into_bytes())
        .await
}

/// Read back what [`store_content`] wrote. A missing chunk reads as absent.
pub async fn load_content(store: &dyn RemoteStore, url: &str) -> Result<Option<Vec<u8>>> {
    let Some(head) = store.get(url).await? else {
        return Ok(None);
    };

    if let Some(compressed) = head.strip_prefix(ZLIB_PREFIX) {
        return decompress(url, compressed).map(Some);
    }

    if let Some(count) = head.strip_prefix(CHUNKS_PREFIX) {
        let count: usize = std::str::from_utf8(count)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| CacheError::Corruption {
                key: url.to_string(),
                details: "unreadable chunk count".to_string(),
            })?;
        let mut compressed = Vec::new();
        for index in 0..count {
            match store.get(&chunk_key(url, index)).await? {
                Some(chunk) => compressed.extend_from_slice(&chunk),
                None => {
                    debug!(url, index, "chunk evicted from store");
                    return Ok(None);
                }
            }
        }
        return decompress(url, &compressed).map(Some);
    }

    Err(CacheError::Corruption {
        key: url.to_string(),
        details: "unrecognized value header".to_string(),
    }
    .into())
}

fn chunk_key(url: &str, index: usize) -> String {
    format!("{}#{}", url, index)
}

fn compress(url: &str, content: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .and_then(|_| encoder.finish())
        .map_err(|e| {
            CacheError::WriteError {
                path: url.into(),
                details: e.to_string(),
            }
            .into()
        })
}

fn decompress(url: &str, compressed: &[u8]) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut content)
        .map_err(|e| CacheError::Corruption {
            key: url.to_string(),
            details: e.to_string(),
        })?;
    Ok(content)
}
