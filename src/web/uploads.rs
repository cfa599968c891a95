//! Storing uploaded images on disk and serving them back with cache validators.
use std::io::{Cursor, ErrorKind};
use std::path::Path as StdPath;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use httpdate::{fmt_http_date, parse_http_date};
use image::ImageFormat;
use rand::Rng;
use rand::distr::Alphanumeric;

use super::prelude::*;
use crate::constants::UPLOAD_CACHE_CONTROL;

/// An image accepted into the upload directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StoredUpload {
    pub(crate) filename: String,
    pub(crate) mime_type: &'static str,
}

/// Validates that `bytes` decode as a supported image and returns its format.
pub(crate) fn detect_image(bytes: &[u8]) -> Result<ImageFormat, AltGenError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| {
            debug!("Failed to guess image format: {}", err);
            AltGenError::BadRequest
        })?;
    let Some(format) = reader.format() else {
        debug!("Unrecognised image format");
        return Err(AltGenError::BadRequest);
    };
    reader.decode().map_err(|err| {
        debug!("Failed to decode image: {}", err);
        AltGenError::BadRequest
    })?;
    Ok(format)
}

fn random_stem() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Writes a validated image under `upload_dir` with a fresh random name.
pub(crate) async fn store_upload(
    upload_dir: &StdPath,
    bytes: &[u8],
) -> Result<StoredUpload, AltGenError> {
    let format = detect_image(bytes)?;
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .ok_or(AltGenError::BadRequest)?;

    tokio::fs::create_dir_all(upload_dir).await?;
    let filename = format!("{}.{}", random_stem(), extension);
    tokio::fs::write(upload_dir.join(&filename), bytes).await?;

    Ok(StoredUpload {
        filename,
        mime_type: format.to_mime_type(),
    })
}

/// Removes a stored upload that never made it into the library.
pub(crate) async fn discard_upload(upload_dir: &StdPath, filename: &str) {
    if let Err(err) = tokio::fs::remove_file(upload_dir.join(filename)).await {
        error!("Failed to remove orphaned upload {}: {}", filename, err);
    }
}

/// Stored names are flat and generated by us; anything else is refused.
pub(crate) fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn weak_etag(size: u64, modified_at: Option<SystemTime>) -> String {
    let secs = modified_at
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
    format!("W/\"{size}-{secs}\"")
}

/// True when the conditional request headers say the client copy is current.
fn client_copy_is_current(
    headers: &HeaderMap,
    etag: &str,
    modified_at: Option<SystemTime>,
) -> bool {
    if let Some(if_none_match) = headers.get(IF_NONE_MATCH) {
        return if_none_match.to_str().is_ok_and(|value| {
            let value = value.trim();
            value == "*" || value.split(',').any(|candidate| candidate.trim() == etag)
        });
    }

    match (
        headers
            .get(IF_MODIFIED_SINCE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_http_date(value).ok()),
        modified_at,
    ) {
        (Some(since), Some(modified)) => modified <= since,
        _ => false,
    }
}

/// GET /uploads/{filename}
pub(crate) async fn serve_upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Response, AltGenError> {
    if !is_safe_filename(&filename) {
        return Err(AltGenError::NotFound(filename));
    }
    let path = state.upload_dir.join(&filename);
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(AltGenError::NotFound(filename)),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AltGenError::NotFound(filename));
        }
        Err(err) => return Err(err.into()),
    };

    let modified_at = metadata.modified().ok();
    let etag = weak_etag(metadata.len(), modified_at);
    let mut builder = Response::builder().header(CACHE_CONTROL, UPLOAD_CACHE_CONTROL.as_str());
    if let Ok(value) = HeaderValue::from_str(&etag) {
        builder = builder.header(ETAG, value);
    }
    if let Some(modified) = modified_at
        && let Ok(value) = HeaderValue::from_str(&fmt_http_date(modified))
    {
        builder = builder.header(LAST_MODIFIED, value);
    }

    if client_copy_is_current(&headers, &etag, modified_at) {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(AltGenError::from);
    }

    let mime_type = ImageFormat::from_path(&path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    let bytes = tokio::fs::read(&path).await?;
    builder
        .header(CONTENT_TYPE, mime_type)
        .body(Body::from(bytes))
        .map_err(AltGenError::from)
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 30, 30]));
    let mut bytes = Cursor::new(Vec::new());
    #[allow(clippy::expect_used)]
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}
