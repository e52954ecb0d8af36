//! Result assembly
//!
//! Finalizes a completed job's document and derives the download file name.

use bytes::Bytes;
use pagebind_core::{AppError, Page};

use crate::pipeline::{CompletedJob, JobReport};

pub const DEFAULT_OUTPUT_NAME: &str = "converted_images";
pub const OUTPUT_EXTENSION: &str = "pdf";
pub const OUTPUT_MIME_TYPE: &str = "application/pdf";

/// The finished document and everything needed to send it.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: &'static str,
    pub pages: Vec<Page>,
    pub report: JobReport,
}

impl ConversionResult {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone)]
pub struct ResultAssembler {
    default_name: String,
}

impl ResultAssembler {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
        }
    }

    pub fn file_name(&self, requested: Option<&str>) -> String {
        sanitize_output_name(requested, &self.default_name)
    }

    pub fn assemble(&self, job: CompletedJob) -> Result<ConversionResult, AppError> {
        let CompletedJob {
            document,
            output_name,
            report,
        } = job;

        if document.is_empty() {
            return Err(AppError::NoValidPages {
                submitted: report.submitted,
            });
        }

        let (bytes, pages) = document
            .finish()
            .map_err(|e| AppError::InternalWithSource {
                message: "Failed to finalize document".to_string(),
                source: anyhow::Error::new(e),
            })?;

        let file_name = self.file_name(output_name.as_deref());
        tracing::debug!(
            file_name = %file_name,
            size_bytes = bytes.len(),
            pages = pages.len(),
            "Document assembled"
        );

        Ok(ConversionResult {
            bytes: Bytes::from(bytes),
            file_name,
            content_type: OUTPUT_MIME_TYPE,
            pages,
            report,
        })
    }
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_NAME)
    }
}

/// Derive a safe output file name.
///
/// Blank input falls back to `default_name`. A trailing `.pdf` is dropped so
/// the extension is never doubled, then every character other than ASCII
/// letters and digits, CJK ideographs, `-` and `_` becomes `_`.
pub fn sanitize_output_name(requested: Option<&str>, default_name: &str) -> String {
    let stem = requested
        .map(str::trim)
        .map(strip_extension)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| strip_extension(default_name.trim()));
    let stem = if stem.is_empty() {
        DEFAULT_OUTPUT_NAME
    } else {
        stem
    };

    let mut name: String = stem
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();
    name.push('.');
    name.push_str(OUTPUT_EXTENSION);
    name
}

fn strip_extension(name: &str) -> &str {
    let suffix_len = OUTPUT_EXTENSION.len() + 1;
    match name.len().checked_sub(suffix_len) {
        Some(split)
            if name.is_char_boundary(split)
                && name[split..].eq_ignore_ascii_case(".pdf") =>
        {
            &name[..split]
        }
        _ => name,
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || ('\u{4e00}'..='\u{9fa5}').contains(&c)
}
