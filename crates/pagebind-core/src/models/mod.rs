//! Data models for the application
//!
//! `item` holds what a request submits (items and the job wrapping them);
//! `document` holds what the pipeline produces (pages of the output document).

mod document;
mod item;

pub use document::*;
pub use item::*;
