//! pagebind HTTP API
//!
//! Router, handlers and startup for the image-to-PDF conversion service.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod utils;

pub use error::HttpAppError;
pub use state::AppState;
