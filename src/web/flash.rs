use tower_sessions::Session;

use crate::error::AltGenError;

const FLASH_FLAG_KEY: &str = "flash_flag";

pub(crate) const FLASH_UPLOAD_SUCCESS: u16 = 1;
pub(crate) const FLASH_ALT_SAVED: u16 = 2;
pub(crate) const FLASH_SETTINGS_SAVED: u16 = 3;

/// What the page templates render for a pending flash message.
#[derive(Clone, Debug, Default)]
pub(crate) struct FlashView {
    pub(crate) present: bool,
    pub(crate) text: &'static str,
    pub(crate) class: &'static str,
}

pub(crate) async fn set_flash(session: &Session, flag: u16) -> Result<(), AltGenError> {
    session.insert(FLASH_FLAG_KEY, flag).await?;
    Ok(())
}

/// Pops the pending flash message, if any.
pub(crate) async fn take_flash(session: &Session) -> Result<FlashView, AltGenError> {
    let flag = session
        .get::<u16>(FLASH_FLAG_KEY)
        .await?
        .filter(|flag| *flag != 0);
    if flag.is_some() {
        session.insert(FLASH_FLAG_KEY, 0u16).await?;
    }
    Ok(flag.and_then(view_for).unwrap_or_default())
}

fn view_for(flag: u16) -> Option<FlashView> {
    let (text, class) = match flag {
        FLASH_UPLOAD_SUCCESS => ("Upload successful. The image is now in the library.", "success"),
        FLASH_ALT_SAVED => ("ALT text saved.", "success"),
        FLASH_SETTINGS_SAVED => ("Settings saved.", "success"),
        _ => return None,
    };
    Some(FlashView {
        present: true,
        text,
        class,
    })
}
