/// Opaque reference to an image already embedded in the output document.
///
/// Handles are issued by the document encoder and only mean something to the
/// encoder that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u32);

/// An image the encoder has accepted, with its pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub handle: ImageHandle,
    pub width: u32,
    pub height: u32,
}

/// One page of the output document, sized to its source image in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Position of the source item in the submitted batch.
    pub item_index: usize,
    pub width: u32,
    pub height: u32,
    pub source: ImageHandle,
}

impl Page {
    pub fn from_embedded(item_index: usize, image: &EmbeddedImage) -> Self {
        Self {
            item_index,
            width: image.width,
            height: image.height,
            source: image.handle,
        }
    }
}
