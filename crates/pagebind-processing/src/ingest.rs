//! Chunked item ingestion
//!
//! Items are read chunk by chunk so that only one item is materialised at a
//! time. Every `quantum` bytes the ingester yields to the scheduler and asks
//! the memory governor to resample.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use pagebind_core::UploadedItem;

use crate::error::ItemError;
use crate::memory::MemoryGovernor;

/// Bytes read between cooperative yields when no quantum is configured.
pub const DEFAULT_YIELD_QUANTUM: usize = 100 * 1024;

/// Reads an item's payload into one contiguous buffer.
#[derive(Debug, Clone)]
pub struct StreamIngester {
    max_item_size: u64,
    quantum: usize,
    governor: MemoryGovernor,
}

impl StreamIngester {
    pub fn new(max_item_size: u64, quantum: usize, governor: MemoryGovernor) -> Self {
        Self {
            max_item_size,
            quantum: quantum.max(1),
            governor,
        }
    }

    /// Consume the item's payload and return its bytes.
    ///
    /// Fails with [`ItemError::TooLarge`] before reading anything when the
    /// declared size is above the per-item ceiling, and with
    /// [`ItemError::Overrun`] as soon as the stream delivers more bytes than
    /// declared.
    pub async fn ingest(&self, item: &mut UploadedItem) -> Result<Bytes, ItemError> {
        let declared = item.declared_size;
        if declared > self.max_item_size {
            return Err(ItemError::TooLarge {
                size: declared,
                max: self.max_item_size,
            });
        }

        let mut chunks: Vec<Bytes> = Vec::new();
        let mut received: u64 = 0;
        let mut since_yield: usize = 0;

        while let Some(chunk) = item.payload.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            if received > declared {
                return Err(ItemError::Overrun { declared });
            }

            since_yield += chunk.len();
            if !chunk.is_empty() {
                chunks.push(chunk);
            }

            if since_yield >= self.quantum {
                since_yield = 0;
                tokio::task::yield_now().await;
                self.governor.check();
            }
        }

        tracing::trace!(
            file_name = %item.file_name,
            received,
            chunks = chunks.len(),
            "Item payload ingested"
        );
        Ok(compact(chunks, received))
    }
}

/// Join chunks into one buffer. A lone chunk is returned as-is.
fn compact(mut chunks: Vec<Bytes>, total: u64) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.pop().unwrap_or_default(),
        _ => {
            let mut buf = BytesMut::with_capacity(total as usize);
            for chunk in chunks {
                buf.extend_from_slice(&chunk);
            }
            buf.freeze()
        }
    }
}
