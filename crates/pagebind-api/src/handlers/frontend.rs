use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `GET /`: the upload page.
pub async fn index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        INDEX_HTML,
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
}
