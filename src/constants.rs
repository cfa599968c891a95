//! Shared constants for generation, tokens and uploads
//!

use std::sync::LazyLock;

/// Chat-completions endpoint used when none is configured.
pub const COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model asked to describe images.
pub const COMPLETION_MODEL: &str = "openai/gpt-4o-mini";

/// Upper bound on generated tokens.
pub const COMPLETION_MAX_TOKENS: u32 = 60;

/// Sampling temperature.
pub const COMPLETION_TEMPERATURE: f32 = 0.4;

/// Request timeout for a single completion call.
pub const COMPLETION_TIMEOUT_SECONDS: u64 = 20;

/// System message fixing tone and brevity.
pub const SYSTEM_INSTRUCTION: &str =
    "You are an assistant that writes concise, descriptive ALT text for images.";

/// Prefix of the user message, the image URL is appended.
pub const USER_INSTRUCTION: &str = "Generate a short descriptive alt text for this image only (do not include 'ALT text:' prefix or quotes): ";

/// Option name the API key is stored under.
pub const API_KEY_OPTION: &str = "ai_alt_generator_api_key";

/// Bulk action name understood by the bulk endpoint.
pub const BULK_ACTION_GENERATE_ALT: &str = "generate_alt_text";

/// Query parameter carrying the bulk success count.
pub const BULK_SUCCEEDED_PARAM: &str = "alt_generated";

/// Query parameter carrying the bulk failure count.
pub const BULK_FAILED_PARAM: &str = "alt_failed";

/// Public path prefix uploads are served under.
pub const UPLOADS_PATH: &str = "uploads";

/// Max age (in seconds) for upload cache entries.
pub const UPLOAD_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60;

/// Cache-Control value for upload responses.
pub static UPLOAD_CACHE_CONTROL: LazyLock<String> =
    LazyLock::new(|| format!("private, max-age={}", UPLOAD_CACHE_MAX_AGE_SECONDS));

/// Length of security tokens
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// How long (in seconds) a security token stays valid
pub const CSRF_TOKEN_LIFETIME_SECONDS: i64 = 60 * 60 * 12;

/// Sessions idle for longer than this (in seconds) are dropped
pub const SESSION_INACTIVITY_SECONDS: i64 = CSRF_TOKEN_LIFETIME_SECONDS;

/// Most sessions held in memory at once
pub const MAX_SESSIONS: usize = 10_000;
