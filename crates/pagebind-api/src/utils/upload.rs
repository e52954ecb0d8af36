//! Multipart reading for conversion requests
//!
//! Parts are read one at a time and the batch limits are checked as bytes
//! arrive. Every part counts towards the total, so an oversized body is refused
//! with the limit it breached before the rest of it is read.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::http::HeaderValue;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use pagebind_core::{AppError, ConversionJob, ItemPayload, UploadedItem};
use pagebind_processing::RequestValidator;

/// Repeated binary field holding the images.
pub const IMAGES_FIELD: &str = "images";
/// Optional text field holding the requested output name.
pub const FILE_NAME_FIELD: &str = "fileName";
/// Longest accepted `fileName` value, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 1024;

fn multipart_error(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::InvalidInput(format!("Failed to read {}: {}", context, e))
}

/// Running byte count over the whole body.
struct BodyBudget<'a> {
    validator: &'a RequestValidator,
    total: u64,
}

impl BodyBudget<'_> {
    fn add(&mut self, len: usize) -> Result<(), AppError> {
        self.total += len as u64;
        self.validator.check_total_size(self.total)
    }

    /// Read and discard the rest of a part, still counting it.
    async fn drain(&mut self, field: &mut Field<'_>) -> Result<(), AppError> {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error("multipart", e))?
        {
            self.add(chunk.len())?;
        }
        Ok(())
    }
}

/// Read a conversion request into a job.
///
/// Only `images` parts that carry a filename become items. A part larger than
/// `max_item_size` is still counted towards the total but its bytes are not
/// kept; it reaches the pipeline with its real size and an empty payload and
/// is skipped there.
pub async fn read_conversion_job(
    mut multipart: Multipart,
    validator: &RequestValidator,
    max_item_size: u64,
) -> Result<ConversionJob, AppError> {
    let mut items = Vec::new();
    let mut output_name: Option<String> = None;
    let mut budget = BodyBudget {
        validator,
        total: 0,
    };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("multipart", e))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == FILE_NAME_FIELD {
            output_name = Some(read_file_name(&mut field, &mut budget).await?);
            continue;
        }

        let file_name = match field.file_name().map(str::to_string) {
            Some(name) if field_name == IMAGES_FIELD => name,
            _ => {
                if field_name == IMAGES_FIELD {
                    tracing::debug!("Ignoring images part without a filename");
                }
                budget.drain(&mut field).await?;
                continue;
            }
        };
        let content_type = field.content_type().map(|s| s.to_string());

        validator.check_item_count(items.len() + 1)?;

        let mut chunks: Vec<Bytes> = Vec::new();
        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error("file data", e))?
        {
            size += chunk.len() as u64;
            budget.add(chunk.len())?;

            if size > max_item_size {
                chunks.clear();
            } else {
                chunks.push(chunk);
            }
        }

        tracing::debug!(
            item_index = items.len(),
            file_name = %file_name,
            content_type = ?content_type,
            declared_size = size,
            "Received image part"
        );

        let payload: ItemPayload = if size > max_item_size {
            stream::empty().boxed()
        } else {
            stream::iter(chunks.into_iter().map(Ok)).boxed()
        };
        items.push(UploadedItem::new(file_name, content_type, size, payload));
    }

    Ok(ConversionJob::new(items, output_name))
}

async fn read_file_name(
    field: &mut Field<'_>,
    budget: &mut BodyBudget<'_>,
) -> Result<String, AppError> {
    let mut raw = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error("fileName", e))?
    {
        budget.add(chunk.len())?;
        if raw.len() + chunk.len() > MAX_FILE_NAME_BYTES {
            return Err(AppError::InvalidInput(format!(
                "fileName exceeds {} bytes",
                MAX_FILE_NAME_BYTES
            )));
        }
        raw.extend_from_slice(&chunk);
    }
    String::from_utf8(raw).map_err(|e| multipart_error("fileName", e))
}

/// `attachment` disposition for a sanitized file name.
///
/// Built from raw bytes so non-ASCII names pass through unchanged.
pub fn content_disposition(file_name: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", file_name).as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        let value = content_disposition("My_Doc_2024.pdf").unwrap();
        assert_eq!(value, "attachment; filename=\"My_Doc_2024.pdf\"");
    }

    #[test]
    fn test_content_disposition_keeps_cjk_bytes() {
        let value = content_disposition("我的文档.pdf").unwrap();
        assert_eq!(
            value.as_bytes(),
            "attachment; filename=\"我的文档.pdf\"".as_bytes()
        );
    }
}
