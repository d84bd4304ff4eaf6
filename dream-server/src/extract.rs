//! Request extractors whose rejections render as [`ServerError`] JSON.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ServerError;

/// `axum::Json` with a `{"error": ...}` 400/413 instead of axum's plain-text
/// 400/415/422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path` with a JSON 400 for unparsable segments.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServerError))]
pub struct PathParams<T>(pub T);
