//! The two ALT text entry points: the single-image ajax call and the bulk action.
//!
//! Both resolve the attachment's public URL, read the API key and hand over to the
//! configured [`AltTextGenerator`](crate::completion::AltTextGenerator). The ajax path
//! only returns the text; the bulk path persists it.
use axum::Json;
use axum::body::Bytes;
use serde::Serialize;

use super::media::bulk_redirect_target;
use super::prelude::*;
use crate::completion::GenerationError;
use crate::constants::BULK_ACTION_GENERATE_ALT;
use crate::settings::{get_api_key, has_api_key};

/// Form posted by the generate button.
#[derive(Deserialize, Debug)]
pub(crate) struct GenerateAltForm {
    attachment_id: Option<String>,
    security: Option<String>,
}

/// `{success, data}` envelope returned to the widget.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct AjaxResponse {
    pub(crate) success: bool,
    pub(crate) data: String,
}

/// Outcome of one bulk run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BulkSummary {
    pub(crate) succeeded: usize,
    pub(crate) failed: usize,
}

fn parse_attachment_id(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

/// Runs one generation for an attachment, checking every precondition before the network.
pub(crate) async fn generate_for_attachment(
    state: &AppState,
    attachment_id: Option<i32>,
) -> Result<String, GenerationError> {
    let id = attachment_id.ok_or(GenerationError::MissingAttachmentId)?;

    let attachment = attachments::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await
        .map_err(|err| GenerationError::Storage(err.to_string()))?
        .ok_or(GenerationError::UnresolvableUrl)?;
    let image_url = state
        .attachment_url(&attachment)
        .ok_or(GenerationError::UnresolvableUrl)?;

    let api_key = get_api_key(state.db.as_ref())
        .await
        .map_err(|err| GenerationError::Storage(err.to_string()))?;
    if !has_api_key(&api_key) {
        return Err(GenerationError::MissingApiKey);
    }

    state
        .generator
        .generate_alt_text(image_url.as_str(), &api_key)
        .await
}

/// POST /admin/ajax/generate-alt
#[instrument(skip_all, fields(attachment_id = ?form.attachment_id))]
pub(crate) async fn generate_alt_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<GenerateAltForm>,
) -> Result<Json<AjaxResponse>, AltGenError> {
    validate_csrf(&session, CsrfAction::GenerateAlt, form.security.as_deref()).await?;

    let attachment_id = form.attachment_id.as_deref().and_then(parse_attachment_id);
    let response = match generate_for_attachment(&state, attachment_id).await {
        Ok(alt_text) => {
            info!("ALT text generated");
            AjaxResponse {
                success: true,
                data: alt_text,
            }
        }
        Err(err) => {
            info!("ALT text generation failed: {err}");
            AjaxResponse {
                success: false,
                data: err.to_string(),
            }
        }
    };
    Ok(Json(response))
}

/// Generates and stores ALT text for each ID in order; a failure never stops the batch.
pub(crate) async fn run_bulk(state: &AppState, ids: &[Option<i32>]) -> BulkSummary {
    let mut summary = BulkSummary::default();
    for id in ids {
        let stored = match generate_for_attachment(state, *id).await {
            Ok(alt_text) => match id {
                Some(id) => attachments::set_alt_text(state.db.as_ref(), *id, &alt_text)
                    .await
                    .unwrap_or_else(|err| {
                        error!("Failed to store ALT text for {id}: {err}");
                        false
                    }),
                None => false,
            },
            Err(err) => {
                debug!("Bulk ALT text failed for {id:?}: {err}");
                false
            }
        };
        if stored {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
    summary
}

/// POST /admin/media/bulk, form-encoded with repeated `media` fields.
pub(crate) async fn bulk_action_handler(
    State(state): State<AppState>,
    session: Session,
    body: Bytes,
) -> Result<Redirect, AltGenError> {
    let mut csrf_token_value: Option<String> = None;
    let mut action: Option<String> = None;
    let mut ids: Vec<Option<i32>> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(&body) {
        match key.as_ref() {
            "csrf_token" => csrf_token_value = Some(value.into_owned()),
            "action" => action = Some(value.into_owned()),
            "media" | "media[]" => ids.push(parse_attachment_id(&value)),
            _ => {}
        }
    }

    validate_csrf(&session, CsrfAction::BulkAction, csrf_token_value.as_deref()).await?;

    if action.as_deref() != Some(BULK_ACTION_GENERATE_ALT) {
        debug!("Ignoring unknown bulk action {action:?}");
        return Ok(Redirect::to("/admin/media"));
    }

    let summary = run_bulk(&state, &ids).await;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Bulk ALT text generation finished"
    );
    Ok(Redirect::to(&bulk_redirect_target(
        summary.succeeded,
        summary.failed,
    )))
}
