use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::{content_disposition, read_conversion_job};
use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
};
use pagebind_core::AppError;
use std::sync::Arc;

/// `POST /convert`: images in, one PDF out.
#[tracing::instrument(skip(state, multipart))]
pub async fn convert_images(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let validator = state.pipeline.validator();
    let job = read_conversion_job(
        multipart,
        validator,
        validator.limits().max_item_size_bytes,
    )
    .await?;

    tracing::info!(
        items = job.item_count(),
        declared_total = job.declared_total(),
        "Conversion request received"
    );

    let completed = state.pipeline.run(job).await?;
    let result = state.assembler.assemble(completed)?;

    tracing::info!(
        file_name = %result.file_name,
        pages = result.page_count(),
        skipped = result.report.skipped.len(),
        size_bytes = result.bytes.len(),
        "Conversion finished"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&result.file_name)?,
        )
        .body(Body::from(result.bytes))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
