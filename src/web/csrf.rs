//! Short-lived security tokens, each scoped to one session and one action.
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::debug;

use crate::constants::{CSRF_TOKEN_LENGTH, CSRF_TOKEN_LIFETIME_SECONDS};
use crate::error::AltGenError;

const CSRF_TOKEN_KEY_PREFIX: &str = "csrf_token";

/// The state-changing request a token authorizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CsrfAction {
    GenerateAlt,
    SaveAlt,
    Upload,
    BulkAction,
    SaveSettings,
}

impl CsrfAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::GenerateAlt => "generate_alt",
            Self::SaveAlt => "save_alt",
            Self::Upload => "upload",
            Self::BulkAction => "bulk_action",
            Self::SaveSettings => "save_settings",
        }
    }

    fn session_key(self) -> String {
        format!("{CSRF_TOKEN_KEY_PREFIX}:{}", self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct IssuedToken {
    value: String,
    issued_at: i64,
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn is_fresh(issued_at: i64, now: i64) -> bool {
    now >= issued_at && now - issued_at < CSRF_TOKEN_LIFETIME_SECONDS
}

fn is_well_formed(token: &str) -> bool {
    token.len() == CSRF_TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Returns the session's current token for `action`, issuing a new one if it's missing or expired.
pub(crate) async fn csrf_token(
    session: &Session,
    action: CsrfAction,
) -> Result<String, AltGenError> {
    let key = action.session_key();
    let now = Utc::now().timestamp();
    let current = session
        .get::<IssuedToken>(&key)
        .await?
        .filter(|token| is_fresh(token.issued_at, now));
    if let Some(token) = current {
        return Ok(token.value);
    }

    let token = IssuedToken {
        value: generate_token(),
        issued_at: now,
    };
    session.insert(&key, token.clone()).await?;
    Ok(token.value)
}

/// Rejects missing, malformed, expired or mismatched tokens, and tokens issued for another action.
pub(crate) async fn validate_csrf(
    session: &Session,
    action: CsrfAction,
    token: Option<&str>,
) -> Result<(), AltGenError> {
    let Some(token) = token.filter(|token| is_well_formed(token)) else {
        debug!(action = action.as_str(), "missing or malformed security token");
        return Err(AltGenError::Unauthorized);
    };
    let stored = session.get::<IssuedToken>(&action.session_key()).await?;
    match stored {
        Some(expected)
            if is_fresh(expected.issued_at, Utc::now().timestamp()) && expected.value == token =>
        {
            Ok(())
        }
        Some(_) => {
            debug!(action = action.as_str(), "expired or mismatched security token");
            Err(AltGenError::Unauthorized)
        }
        None => Err(AltGenError::Unauthorized),
    }
}
