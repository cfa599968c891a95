pub(crate) use crate::db::entities::attachments;
pub(crate) use crate::error::AltGenError;
pub(crate) use crate::web::AppState;
pub(crate) use crate::web::csrf::{CsrfAction, csrf_token, validate_csrf};
pub(crate) use crate::web::flash;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Form, Path, Query, State};
pub(crate) use axum::response::Redirect;
pub(crate) use sea_orm::EntityTrait;
pub(crate) use serde::Deserialize;
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::{debug, error, info, instrument};
