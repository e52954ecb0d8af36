//! Page composition
//!
//! [`OutputDocument`] is the job's document under construction. Pages can
//! only be appended, and only through [`PageComposer::compose`].

use bytes::Bytes;
use pagebind_core::{EmbeddedImage, Page};

use crate::decoder::RawImage;
use crate::encoder::{DocumentEncoder, EncodeError, PdfEncoder};

/// Image prepared for placement on a page. Borrowed pixel data lives only as
/// long as the current pipeline iteration.
#[derive(Debug)]
pub enum DecodedImage<'a> {
    Jpeg(Bytes),
    Png(Bytes),
    Raw(RawImage<'a>),
}

pub struct OutputDocument {
    encoder: Box<dyn DocumentEncoder>,
    pages: Vec<Page>,
}

impl OutputDocument {
    pub fn new(encoder: Box<dyn DocumentEncoder>) -> Self {
        Self {
            encoder,
            pages: Vec::new(),
        }
    }

    /// Empty PDF document.
    pub fn pdf() -> Self {
        Self::new(Box::new(PdfEncoder::new()))
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Serialize the document and hand back its pages.
    pub fn finish(self) -> Result<(Vec<u8>, Vec<Page>), EncodeError> {
        let bytes = self.encoder.finish()?;
        Ok((bytes, self.pages))
    }
}

impl std::fmt::Debug for OutputDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDocument")
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

/// Appends one full-bleed page per decoded image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageComposer;

impl PageComposer {
    pub fn new() -> Self {
        Self
    }

    /// Embed `image` and append a page of exactly its pixel size.
    ///
    /// On error the document is unchanged apart from a possibly orphaned
    /// embedded image, which never appears on a page.
    pub fn compose(
        &self,
        doc: &mut OutputDocument,
        item_index: usize,
        image: DecodedImage<'_>,
    ) -> Result<Page, EncodeError> {
        let embedded: EmbeddedImage = match image {
            DecodedImage::Jpeg(data) => doc.encoder.embed_jpeg(data)?,
            DecodedImage::Png(data) => doc.encoder.embed_png(&data)?,
            DecodedImage::Raw(raw) => doc.encoder.embed_raw(&raw)?,
        };
        doc.encoder.add_page(&embedded)?;

        let page = Page::from_embedded(item_index, &embedded);
        doc.pages.push(page);
        tracing::debug!(
            item_index,
            width = page.width,
            height = page.height,
            page_number = doc.pages.len(),
            "Page composed"
        );
        Ok(page)
    }
}
