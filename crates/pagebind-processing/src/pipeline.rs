//! Conversion pipeline
//!
//! Drives one job item by item, in submission order:
//! ingest, resolve the decode path, decode if needed, compose a page. A
//! failure in any of those steps skips the item; only batch validation and an
//! empty result fail the job.

use std::fmt;
use std::sync::Arc;

use pagebind_core::{AppError, ConversionJob, Page, ResourceLimits, UploadedItem};

use crate::composer::{DecodedImage, OutputDocument, PageComposer};
use crate::decoder::{DecoderFactory, LazyDecoder, WebpDecoderFactory};
use crate::error::ItemError;
use crate::format::{FormatDispatcher, ImageKind};
use crate::ingest::{StreamIngester, DEFAULT_YIELD_QUANTUM};
use crate::memory::MemoryGovernor;
use crate::validator::RequestValidator;

/// Where a job currently is. Item states carry the item's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Ingesting(usize),
    Decoding(usize),
    Composing(usize),
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Ingesting(i) => write!(f, "ingesting({})", i),
            JobState::Decoding(i) => write!(f, "decoding({})", i),
            JobState::Composing(i) => write!(f, "composing({})", i),
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// An item that contributed no page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub index: usize,
    pub file_name: String,
    /// State the item was in when it failed.
    pub stage: JobState,
    pub reason: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub submitted: usize,
    pub pages: usize,
    pub skipped: Vec<SkippedItem>,
    pub state: JobState,
}

/// A job that finished with at least one page, ready for assembly.
#[derive(Debug)]
pub struct CompletedJob {
    pub document: OutputDocument,
    pub output_name: Option<String>,
    pub report: JobReport,
}

impl CompletedJob {
    pub fn pages(&self) -> &[Page] {
        self.document.pages()
    }
}

/// Sequential, resource-bounded image-to-document converter.
///
/// The pipeline itself is stateless between runs and can be shared; every run
/// gets its own output document and its own decoder slot.
#[derive(Clone)]
pub struct ConversionPipeline {
    validator: RequestValidator,
    ingester: StreamIngester,
    dispatcher: FormatDispatcher,
    composer: PageComposer,
    decoder_factory: Arc<dyn DecoderFactory>,
}

impl ConversionPipeline {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            validator: RequestValidator::new(limits),
            ingester: StreamIngester::new(
                limits.max_item_size_bytes,
                DEFAULT_YIELD_QUANTUM,
                MemoryGovernor::new(limits.memory_watermark_bytes),
            ),
            dispatcher: FormatDispatcher::new(),
            composer: PageComposer::new(),
            decoder_factory: Arc::new(WebpDecoderFactory::new(limits.memory_watermark_bytes)),
        }
    }

    /// Replace the ingester, e.g. to change the yield quantum or attach a
    /// heap sampler to its governor.
    pub fn with_ingester(mut self, ingester: StreamIngester) -> Self {
        self.ingester = ingester;
        self
    }

    pub fn with_decoder_factory(mut self, factory: Arc<dyn DecoderFactory>) -> Self {
        self.decoder_factory = factory;
        self
    }

    pub fn validator(&self) -> &RequestValidator {
        &self.validator
    }

    /// Run a job to completion.
    ///
    /// Fails with a batch validation error before touching any item, or with
    /// [`AppError::NoValidPages`] when every item was skipped.
    #[tracing::instrument(skip(self, job), fields(items = job.item_count()))]
    pub async fn run(&self, job: ConversionJob) -> Result<CompletedJob, AppError> {
        let mut state = JobState::Pending;

        if let Err(e) = self.validator.validate(&job.summary()) {
            advance(&mut state, JobState::Failed);
            return Err(e);
        }

        let ConversionJob { items, output_name } = job;
        let submitted = items.len();
        let mut document = OutputDocument::pdf();
        let mut decoder = LazyDecoder::new(self.decoder_factory.clone());
        let mut skipped = Vec::new();

        for (index, mut item) in items.into_iter().enumerate() {
            let result = self
                .process_item(index, &mut item, &mut document, &mut decoder, &mut state)
                .await;
            decoder.release();

            if let Err(e) = result {
                log_skipped(index, &item, state, &e);
                skipped.push(SkippedItem {
                    index,
                    file_name: item.file_name.clone(),
                    stage: state,
                    reason: e.reason(),
                    message: e.to_string(),
                });
            }
            drop(item);

            tokio::task::yield_now().await;
        }

        if document.is_empty() {
            advance(&mut state, JobState::Failed);
            tracing::warn!(submitted, skipped = skipped.len(), "No item produced a page");
            return Err(AppError::NoValidPages { submitted });
        }

        advance(&mut state, JobState::Done);
        let report = JobReport {
            submitted,
            pages: document.page_count(),
            skipped,
            state,
        };
        tracing::info!(
            submitted,
            pages = report.pages,
            skipped = report.skipped.len(),
            "Conversion job finished"
        );

        Ok(CompletedJob {
            document,
            output_name,
            report,
        })
    }

    async fn process_item(
        &self,
        index: usize,
        item: &mut UploadedItem,
        document: &mut OutputDocument,
        decoder: &mut LazyDecoder,
        state: &mut JobState,
    ) -> Result<Page, ItemError> {
        advance(state, JobState::Ingesting(index));
        let data = self.ingester.ingest(item).await?;

        advance(state, JobState::Decoding(index));
        let kind = self
            .dispatcher
            .resolve(item.content_type.as_deref(), &item.file_name)?;

        let page = match kind {
            ImageKind::Jpeg => {
                advance(state, JobState::Composing(index));
                self.composer
                    .compose(document, index, DecodedImage::Jpeg(data))?
            }
            ImageKind::Png => {
                advance(state, JobState::Composing(index));
                self.composer
                    .compose(document, index, DecodedImage::Png(data))?
            }
            ImageKind::Webp => {
                let raster = decoder.get().await?;
                let raw = raster.decode(&data)?;
                drop(data);
                advance(state, JobState::Composing(index));
                self.composer
                    .compose(document, index, DecodedImage::Raw(raw))?
            }
        };
        Ok(page)
    }
}

impl fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("validator", &self.validator)
            .field("ingester", &self.ingester)
            .finish_non_exhaustive()
    }
}

fn advance(state: &mut JobState, next: JobState) {
    tracing::trace!(from = %state, to = %next, "Job state transition");
    *state = next;
}

fn log_skipped(index: usize, item: &UploadedItem, stage: JobState, error: &ItemError) {
    if error.is_rejection() {
        tracing::warn!(
            item_index = index,
            file_name = %item.file_name,
            content_type = ?item.content_type,
            declared_size = item.declared_size,
            stage = %stage,
            error = %error,
            "Skipping item"
        );
    } else {
        tracing::error!(
            item_index = index,
            file_name = %item.file_name,
            content_type = ?item.content_type,
            stage = %stage,
            error = %error,
            "Failed to convert item, skipping"
        );
    }
}
