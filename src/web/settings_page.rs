//! The API key settings page.
use super::prelude::*;
use crate::settings::{get_api_key, set_api_key};

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub(crate) struct SettingsTemplate {
    api_key: String,
    csrf_token: String,
    flash: flash::FlashView,
}

#[derive(Deserialize)]
pub(crate) struct SettingsForm {
    csrf_token: Option<String>,
    #[serde(default)]
    api_key: String,
}

/// GET /admin/settings
pub(crate) async fn settings_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<SettingsTemplate, AltGenError> {
    Ok(SettingsTemplate {
        api_key: get_api_key(state.db.as_ref()).await?,
        csrf_token: csrf_token(&session, CsrfAction::SaveSettings).await?,
        flash: flash::take_flash(&session).await?,
    })
}

/// POST /admin/settings
#[instrument(skip_all)]
pub(crate) async fn save_settings_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AltGenError> {
    validate_csrf(&session, CsrfAction::SaveSettings, form.csrf_token.as_deref()).await?;
    set_api_key(state.db.as_ref(), &form.api_key).await?;
    info!("API key updated");
    flash::set_flash(&session, flash::FLASH_SETTINGS_SAVED).await?;
    Ok(Redirect::to("/admin/settings"))
}
