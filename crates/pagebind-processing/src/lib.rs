//! pagebind processing library
//!
//! The resource-bounded conversion pipeline: batch validation, chunked
//! ingestion, memory backpressure, decode dispatch, page composition and
//! result assembly. The document encoder (lopdf) and the WebP decoder sit
//! behind the [`DocumentEncoder`] and [`RasterDecoder`] traits.

pub mod assembler;
pub mod composer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod ingest;
pub mod memory;
pub mod pipeline;
pub mod validator;

pub use assembler::{
    sanitize_output_name, ConversionResult, ResultAssembler, DEFAULT_OUTPUT_NAME,
    OUTPUT_EXTENSION, OUTPUT_MIME_TYPE,
};
pub use composer::{DecodedImage, OutputDocument, PageComposer};
pub use decoder::{
    DecodeError, DecoderFactory, LazyDecoder, PixelLayout, RasterDecoder, RawImage, WebpDecoder,
    WebpDecoderFactory, DEFAULT_DECODE_BUDGET_BYTES,
};
pub use encoder::{DocumentEncoder, EncodeError, PdfEncoder};
pub use error::ItemError;
pub use format::{normalize_mime_type, FormatDispatcher, ImageKind};
pub use ingest::{StreamIngester, DEFAULT_YIELD_QUANTUM};
pub use memory::{HeapSampler, MemoryGovernor, MemoryPressure, ReclaimHint};
pub use pipeline::{CompletedJob, ConversionPipeline, JobReport, JobState, SkippedItem};
pub use validator::RequestValidator;
