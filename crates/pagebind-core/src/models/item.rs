use std::fmt;
use std::io;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

/// Chunked payload of one uploaded item.
pub type ItemPayload = BoxStream<'static, Result<Bytes, io::Error>>;

/// One uploaded image plus its declared metadata.
///
/// The payload stays opaque until the pipeline ingests it; the declared size is
/// what the client (or the multipart reader) reported, and is what batch
/// validation counts.
pub struct UploadedItem {
    pub file_name: String,
    pub content_type: Option<String>,
    pub declared_size: u64,
    pub payload: ItemPayload,
}

impl UploadedItem {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        declared_size: u64,
        payload: ItemPayload,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            declared_size,
            payload,
        }
    }

    /// Item backed by chunks already received, declared size = their total length.
    pub fn from_chunks(
        file_name: impl Into<String>,
        content_type: Option<String>,
        chunks: Vec<Bytes>,
    ) -> Self {
        let declared_size = chunks.iter().map(|c| c.len() as u64).sum();
        Self::new(
            file_name,
            content_type,
            declared_size,
            stream::iter(chunks.into_iter().map(Ok)).boxed(),
        )
    }

    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::from_chunks(
            file_name,
            content_type.map(str::to_string),
            vec![data.into()],
        )
    }
}

impl fmt::Debug for UploadedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedItem")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// Declared shape of a batch, all the validator needs to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub item_count: usize,
    pub declared_total: u64,
}

/// One conversion request: items in submission order and the requested output name.
#[derive(Debug, Default)]
pub struct ConversionJob {
    pub items: Vec<UploadedItem>,
    pub output_name: Option<String>,
}

impl ConversionJob {
    pub fn new(items: Vec<UploadedItem>, output_name: Option<String>) -> Self {
        Self { items, output_name }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn declared_total(&self) -> u64 {
        self.items.iter().map(|i| i.declared_size).sum()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            item_count: self.item_count(),
            declared_total: self.declared_total(),
        }
    }
}
