//! API key storage on top of the generic options table.

use sea_orm::{DatabaseConnection, DbErr};

use crate::constants::API_KEY_OPTION;
use crate::db::entities::options;

/// Returns the stored API key, or an empty string if none was saved.
pub async fn get_api_key(db: &DatabaseConnection) -> Result<String, DbErr> {
    Ok(options::get(db, API_KEY_OPTION).await?.unwrap_or_default())
}

/// A key of only whitespace counts as unset, so no request is made with it.
pub fn has_api_key(api_key: &str) -> bool {
    !api_key.trim().is_empty()
}

/// Stores the API key as given, no trimming or validation.
pub async fn set_api_key(db: &DatabaseConnection, api_key: &str) -> Result<(), DbErr> {
    options::set(db, API_KEY_OPTION, api_key).await
}
