//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// Errors surfaced by the web layer.
#[derive(Debug)]
pub enum AltGenError {
    /// When you didn't do the right thing
    BadRequest,
    /// Missing, malformed or expired security token
    Unauthorized,
    /// When DB operations fail
    DatabaseError(sea_orm::DbErr),
    /// When a requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<sea_orm::DbErr> for AltGenError {
    fn from(err: sea_orm::DbErr) -> Self {
        AltGenError::DatabaseError(err)
    }
}

impl From<std::io::Error> for AltGenError {
    fn from(err: std::io::Error) -> Self {
        AltGenError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for AltGenError {
    fn from(err: axum::http::Error) -> Self {
        AltGenError::InternalServerError(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AltGenError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AltGenError::InternalServerError(err.to_string())
    }
}

impl std::fmt::Display for AltGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "Bad request"),
            Self::Unauthorized => write!(f, "Invalid or missing security token"),
            Self::DatabaseError(err) => write!(f, "Database error: {err}"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for AltGenError {}

impl IntoResponse for AltGenError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AltGenError::BadRequest => {
                info!("Bad request received");
                (axum::http::StatusCode::BAD_REQUEST, "Bad Request")
            }
            AltGenError::Unauthorized => {
                info!("Request rejected: invalid or missing security token");
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    "Unauthorized: invalid or missing security token.",
                )
            }
            AltGenError::DatabaseError(err) => {
                tracing::error!("Database error: {}", err);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error",
                )
            }
            AltGenError::NotFound(what) => {
                tracing::debug!("404 {what}");
                (axum::http::StatusCode::NOT_FOUND, "Not Found")
            }
            AltGenError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                )
            }
        };
        let mut response = axum::response::Response::new(axum::body::Body::from(body));
        *response.status_mut() = status;
        response
    }
}
