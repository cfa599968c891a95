//! Media library pages: listing, upload, attachment detail and manual ALT saves.
use axum::extract::Multipart;

use super::prelude::*;
use super::uploads::{discard_upload, store_upload};
use crate::constants::{BULK_ACTION_GENERATE_ALT, BULK_FAILED_PARAM, BULK_SUCCEEDED_PARAM};

/// Counts carried back from the bulk action redirect.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct LibraryQuery {
    alt_generated: Option<u32>,
    alt_failed: Option<u32>,
}

#[derive(Clone, Debug)]
struct LibraryItem {
    id: i32,
    title: String,
    src: String,
    alt_text: String,
    has_alt: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "library.html")]
pub(crate) struct LibraryTemplate {
    items: Vec<LibraryItem>,
    has_items: bool,
    upload_token: String,
    bulk_token: String,
    bulk_action: &'static str,
    has_bulk_notice: bool,
    bulk_succeeded: u32,
    bulk_failed: u32,
    has_bulk_failures: bool,
    flash: flash::FlashView,
}

#[derive(Template, WebTemplate)]
#[template(path = "attachment.html")]
pub(crate) struct AttachmentTemplate {
    id: i32,
    title: String,
    src: String,
    public_url: String,
    alt_text: String,
    generate_nonce: String,
    save_token: String,
    flash: flash::FlashView,
}

#[derive(Deserialize)]
pub(crate) struct AltTextForm {
    csrf_token: Option<String>,
    alt_text: String,
}

/// Browser-relative location of a stored upload.
fn upload_src(filename: &str) -> String {
    format!("/uploads/{filename}")
}

/// GET /admin/media
pub(crate) async fn library_handler(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LibraryQuery>,
) -> Result<LibraryTemplate, AltGenError> {
    let items: Vec<LibraryItem> = attachments::Entity::newest_first(state.db.as_ref())
        .await?
        .into_iter()
        .map(|attachment| LibraryItem {
            id: attachment.id,
            src: upload_src(&attachment.filename),
            has_alt: !attachment.alt_text.is_empty(),
            title: attachment.title,
            alt_text: attachment.alt_text,
        })
        .collect();

    let has_bulk_notice = query.alt_generated.is_some() || query.alt_failed.is_some();
    let bulk_failed = query.alt_failed.unwrap_or(0);

    Ok(LibraryTemplate {
        has_items: !items.is_empty(),
        items,
        upload_token: csrf_token(&session, CsrfAction::Upload).await?,
        bulk_token: csrf_token(&session, CsrfAction::BulkAction).await?,
        bulk_action: BULK_ACTION_GENERATE_ALT,
        has_bulk_notice,
        bulk_succeeded: query.alt_generated.unwrap_or(0),
        bulk_failed,
        has_bulk_failures: bulk_failed > 0,
        flash: flash::take_flash(&session).await?,
    })
}

/// GET /admin/media/{id}
pub(crate) async fn attachment_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<AttachmentTemplate, AltGenError> {
    let Some(attachment) = attachments::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
    else {
        return Err(AltGenError::NotFound(format!("attachment {id}")));
    };

    let public_url = state
        .attachment_url(&attachment)
        .map(|url| url.to_string())
        .unwrap_or_default();

    Ok(AttachmentTemplate {
        id: attachment.id,
        src: upload_src(&attachment.filename),
        public_url,
        title: attachment.title,
        alt_text: attachment.alt_text,
        generate_nonce: csrf_token(&session, CsrfAction::GenerateAlt).await?,
        save_token: csrf_token(&session, CsrfAction::SaveAlt).await?,
        flash: flash::take_flash(&session).await?,
    })
}

/// POST /admin/media/{id}, the user's own save of the ALT field.
#[instrument(skip_all, fields(id = %id))]
pub(crate) async fn save_alt_handler(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<AltTextForm>,
) -> Result<Redirect, AltGenError> {
    validate_csrf(&session, CsrfAction::SaveAlt, form.csrf_token.as_deref()).await?;

    if !attachments::set_alt_text(state.db.as_ref(), id, &form.alt_text).await? {
        return Err(AltGenError::NotFound(format!("attachment {id}")));
    }
    info!("ALT text saved");
    flash::set_flash(&session, flash::FLASH_ALT_SAVED).await?;
    Ok(Redirect::to(&format!("/admin/media/{id}")))
}

/// POST /admin/media/upload
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Redirect, AltGenError> {
    let mut csrf_token_value: Option<String> = None;
    let mut title: Option<String> = None;
    let mut image: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AltGenError::InternalServerError(err.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "csrf_token" => {
                csrf_token_value = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AltGenError::InternalServerError(err.to_string()))?,
                );
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AltGenError::InternalServerError(err.to_string()))?,
                );
            }
            "image" => {
                let original_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AltGenError::InternalServerError(err.to_string()))?;
                image = Some((original_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    validate_csrf(&session, CsrfAction::Upload, csrf_token_value.as_deref()).await?;
    let (original_name, bytes) = image.ok_or(AltGenError::BadRequest)?;

    let stored = store_upload(&state.upload_dir, &bytes).await?;
    let title = title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .or(original_name)
        .unwrap_or_else(|| stored.filename.clone());

    let attachment =
        match attachments::create(state.db.as_ref(), &stored.filename, &title, stored.mime_type)
            .await
        {
            Ok(attachment) => attachment,
            Err(err) => {
                discard_upload(&state.upload_dir, &stored.filename).await;
                return Err(err.into());
            }
        };
    info!(id = attachment.id, filename = %stored.filename, "Stored upload");

    flash::set_flash(&session, flash::FLASH_UPLOAD_SUCCESS).await?;
    Ok(Redirect::to(&format!("/admin/media/{}", attachment.id)))
}

/// Builds the library URL the bulk action redirects to.
pub(crate) fn bulk_redirect_target(succeeded: usize, failed: usize) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(BULK_SUCCEEDED_PARAM, &succeeded.to_string())
        .append_pair(BULK_FAILED_PARAM, &failed.to_string())
        .finish();
    format!("/admin/media?{query}")
}
