//! Admin web surface: media library, ALT text generation and settings.
use std::num::NonZeroU16;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::{error, info};
use url::Url;

use crate::completion::AltTextGenerator;
use crate::constants::{MAX_SESSIONS, SESSION_INACTIVITY_SECONDS, UPLOADS_PATH};
use crate::db::entities::attachments;
use self::session_store::BoundedMemoryStore;

mod alt;
mod csrf;
pub(crate) mod flash;
mod media;
mod prelude;
mod session_store;
mod settings_page;
mod uploads;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub(crate) struct AppState {
    db: Arc<DatabaseConnection>,
    generator: Arc<dyn AltTextGenerator>,
    public_url: Url,
    upload_dir: PathBuf,
}

impl AppState {
    pub(crate) fn new(
        db: DatabaseConnection,
        generator: Arc<dyn AltTextGenerator>,
        mut public_url: Url,
        upload_dir: PathBuf,
    ) -> Self {
        if !public_url.path().ends_with('/') {
            let path = format!("{}/", public_url.path());
            public_url.set_path(&path);
        }
        Self {
            db: Arc::new(db),
            generator,
            public_url,
            upload_dir,
        }
    }

    /// The absolute URL the model fetches the attachment from, if it has one.
    pub(crate) fn attachment_url(&self, attachment: &attachments::Model) -> Option<Url> {
        let filename = attachment.filename.trim();
        if !uploads::is_safe_filename(filename) {
            return None;
        }
        self.public_url
            .join(&format!("{UPLOADS_PATH}/{filename}"))
            .ok()
    }
}

async fn admin_js_handler() -> impl IntoResponse {
    const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/admin.js"));
    ([(CONTENT_TYPE, "text/javascript")], SCRIPT)
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

fn create_router(state: AppState) -> Router {
    let secure_cookies = state.public_url.scheme() == "https";
    let session_layer = SessionManagerLayer::new(BoundedMemoryStore::new(MAX_SESSIONS))
        .with_secure(secure_cookies)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            SESSION_INACTIVITY_SECONDS,
        )));

    Router::new()
        .route("/", get(|| async { Redirect::to("/admin/media") }))
        .route("/admin/", get(|| async { Redirect::to("/admin/media") }))
        .route("/static/admin.js", get(admin_js_handler))
        .route("/static/styles.css", get(styles_handler))
        .route("/admin/media", get(media::library_handler))
        .route(
            "/admin/media/upload",
            post(media::upload_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/admin/media/bulk", post(alt::bulk_action_handler))
        .route(
            "/admin/media/{id}",
            get(media::attachment_handler).post(media::save_alt_handler),
        )
        .route("/admin/ajax/generate-alt", post(alt::generate_alt_handler))
        .route(
            "/admin/settings",
            get(settings_page::settings_handler).post(settings_page::save_settings_handler),
        )
        .route(
            &format!("/{UPLOADS_PATH}/{{filename}}"),
            get(uploads::serve_upload_handler),
        )
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Binds the listener and serves the admin until the process stops.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    public_url: Url,
    upload_dir: PathBuf,
    db: DatabaseConnection,
    generator: Arc<dyn AltTextGenerator>,
) -> Result<(), anyhow::Error> {
    tokio::fs::create_dir_all(&upload_dir).await?;
    let app = create_router(AppState::new(db, generator, public_url, upload_dir));

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sea_orm::{ConnectionTrait, EntityTrait};
    use tower::ServiceExt;

    use crate::completion::GenerationError;

    /// Describes every image as "alt for <url>", except URLs containing "broken".
    #[derive(Default)]
    struct StubGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AltTextGenerator for StubGenerator {
        async fn generate_alt_text(
            &self,
            image_url: &str,
            api_key: &str,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!api_key.is_empty());
            if image_url.contains("broken") {
                return Err(GenerationError::ApiError("invalid_api_key".to_string()));
            }
            Ok(format!("alt for {image_url}"))
        }
    }

    struct Harness {
        app: Router,
        db: Arc<DatabaseConnection>,
        generator: Arc<StubGenerator>,
        upload_dir: tempfile::TempDir,
    }

    async fn setup() -> Harness {
        let db = crate::db::connect_test_db()
            .await
            .expect("connect test db");
        let generator = Arc::new(StubGenerator::default());
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(
            db,
            generator.clone(),
            Url::parse("https://media.example.org/site").expect("url"),
            upload_dir.path().to_path_buf(),
        );
        let db = state.db.clone();
        Harness {
            app: create_router(state),
            db,
            generator,
            upload_dir,
        }
    }

    async fn add_attachment(db: &DatabaseConnection, filename: &str) -> i32 {
        attachments::create(db, filename, filename, "image/png")
            .await
            .expect("insert attachment")
            .id
    }

    async fn read_body(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    /// Loads `uri`, joining the session in `cookie` or opening a new one; returns (cookie, body).
    async fn load_page(app: &Router, uri: &str, cookie: Option<&str>) -> (String, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = match cookie {
            Some(cookie) => cookie.to_string(),
            None => response
                .headers()
                .get(SET_COOKIE)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(';').next())
                .expect("session cookie")
                .to_string(),
        };
        (cookie, read_body(response).await)
    }

    /// The token that directly follows `marker` in a rendered page.
    fn token_after(body: &str, marker: &str) -> String {
        let start = body.find(marker).expect("marker in page") + marker.len();
        body[start..start + crate::constants::CSRF_TOKEN_LENGTH].to_string()
    }

    /// The hidden token of the form posting to `action`.
    fn form_token(body: &str, action: &str) -> String {
        let form = body
            .find(&format!("action=\"{action}\""))
            .expect("form in page");
        token_after(&body[form..], "name=\"csrf_token\" value=\"")
    }

    /// Opens a session on the settings page; returns (cookie, settings token).
    async fn settings_session(app: &Router) -> (String, String) {
        let (cookie, body) = load_page(app, "/admin/settings", None).await;
        let token = form_token(&body, "/admin/settings");
        (cookie, token)
    }

    /// Opens a session on an attachment page; returns (cookie, generate nonce, save token).
    async fn attachment_session(app: &Router, id: i32) -> (String, String, String) {
        let uri = format!("/admin/media/{id}");
        let (cookie, body) = load_page(app, &uri, None).await;
        let nonce = token_after(&body, "data-altgen-nonce=\"");
        let save = form_token(&body, &uri);
        (cookie, nonce, save)
    }

    /// Opens a session on the library page; returns (cookie, upload token, bulk token).
    async fn library_session(app: &Router) -> (String, String, String) {
        let (cookie, body) = load_page(app, "/admin/media", None).await;
        let upload = form_token(&body, "/admin/media/upload");
        let bulk = form_token(&body, "/admin/media/bulk");
        (cookie, upload, bulk)
    }

    async fn post_form(
        app: &Router,
        uri: &str,
        cookie: Option<&str>,
        body: String,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        app.clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    async fn alt_text_of(db: &DatabaseConnection, id: i32) -> String {
        attachments::Entity::find_by_id(id)
            .one(db)
            .await
            .expect("fetch attachment")
            .expect("attachment exists")
            .alt_text
    }

    #[tokio::test]
    async fn attachment_urls_resolve_under_public_url() {
        let harness = setup().await;
        let id = add_attachment(&harness.db, "abc.png").await;
        let model = attachments::Entity::find_by_id(id)
            .one(harness.db.as_ref())
            .await
            .unwrap()
            .unwrap();
        let state = AppState::new(
            crate::db::connect_test_db().await.unwrap(),
            harness.generator.clone(),
            Url::parse("https://media.example.org/site").unwrap(),
            PathBuf::from("/tmp"),
        );
        assert_eq!(
            state.attachment_url(&model).map(|url| url.to_string()),
            Some("https://media.example.org/site/uploads/abc.png".to_string())
        );

        let blank = attachments::Model {
            filename: "  ".to_string(),
            ..model
        };
        assert_eq!(state.attachment_url(&blank), None);
    }

    #[tokio::test]
    async fn ajax_rejects_missing_or_bad_token_before_generating() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let id = add_attachment(&harness.db, "cat.png").await;
        let (cookie, token, _) = attachment_session(&harness.app, id).await;

        let cases = [
            (None, format!("attachment_id={id}&security={token}")),
            (Some(cookie.as_str()), format!("attachment_id={id}")),
            (Some(cookie.as_str()), format!("attachment_id={id}&security=short")),
            (
                Some(cookie.as_str()),
                format!("attachment_id={id}&security={}", "x".repeat(32)),
            ),
        ];
        for (cookie, body) in cases {
            let response =
                post_form(&harness.app, "/admin/ajax/generate-alt", cookie, body).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ajax_returns_text_without_persisting() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let id = add_attachment(&harness.db, "cat.png").await;
        let (cookie, token, _) = attachment_session(&harness.app, id).await;

        let response = post_form(
            &harness.app,
            "/admin/ajax/generate-alt",
            Some(&cookie),
            format!("attachment_id={id}&security={token}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(
            body["data"],
            "alt for https://media.example.org/site/uploads/cat.png"
        );
        assert_eq!(alt_text_of(&harness.db, id).await, "");
    }

    #[tokio::test]
    async fn ajax_precondition_failures_skip_the_network() {
        let harness = setup().await;
        let id = add_attachment(&harness.db, "cat.png").await;
        let (cookie, token, _) = attachment_session(&harness.app, id).await;

        let cases = [
            (format!("security={token}"), "Could not find attachment ID."),
            (
                format!("attachment_id=abc&security={token}"),
                "Could not find attachment ID.",
            ),
            (
                format!("attachment_id=9999&security={token}"),
                "Image URL not found.",
            ),
            (
                format!("attachment_id={id}&security={token}"),
                "API key not set. Please add it in Settings → AI ALT Generator.",
            ),
        ];
        for (body, message) in cases {
            let response =
                post_form(&harness.app, "/admin/ajax/generate-alt", Some(&cookie), body).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value =
                serde_json::from_str(&read_body(response).await).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["data"], message);
        }
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ajax_surfaces_api_errors() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let id = add_attachment(&harness.db, "broken.png").await;
        let (cookie, token, _) = attachment_session(&harness.app, id).await;

        let response = post_form(
            &harness.app,
            "/admin/ajax/generate-alt",
            Some(&cookie),
            format!("attachment_id={id}&security={token}"),
        )
        .await;
        let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], "API error: invalid_api_key");
        assert_eq!(alt_text_of(&harness.db, id).await, "");
    }

    #[tokio::test]
    async fn bulk_counts_and_writes_only_successes() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let first = add_attachment(&harness.db, "first.png").await;
        let blank = add_attachment(&harness.db, "").await;
        let second = add_attachment(&harness.db, "second.png").await;
        let broken = add_attachment(&harness.db, "broken.png").await;
        attachments::set_alt_text(harness.db.as_ref(), second, "old text")
            .await
            .unwrap();
        let (cookie, _, token) = library_session(&harness.app).await;

        let body = format!(
            "csrf_token={token}&action=generate_alt_text&media={first}&media=4242&media={blank}&media%5B%5D={second}&media={broken}"
        );
        let response = post_form(&harness.app, "/admin/media/bulk", Some(&cookie), body).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/admin/media?alt_generated=2&alt_failed=3"
        );

        assert_eq!(
            alt_text_of(&harness.db, first).await,
            "alt for https://media.example.org/site/uploads/first.png"
        );
        assert_eq!(
            alt_text_of(&harness.db, second).await,
            "alt for https://media.example.org/site/uploads/second.png"
        );
        assert_eq!(alt_text_of(&harness.db, blank).await, "");
        assert_eq!(alt_text_of(&harness.db, broken).await, "");
        // unresolvable IDs never reach the generator
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bulk_without_key_fails_every_item() {
        let harness = setup().await;
        let first = add_attachment(&harness.db, "first.png").await;
        let second = add_attachment(&harness.db, "second.png").await;
        let (cookie, _, token) = library_session(&harness.app).await;

        let body =
            format!("csrf_token={token}&action=generate_alt_text&media={first}&media={second}");
        let response = post_form(&harness.app, "/admin/media/bulk", Some(&cookie), body).await;
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/admin/media?alt_generated=0&alt_failed=2"
        );
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bulk_ignores_other_actions_and_needs_token() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let id = add_attachment(&harness.db, "first.png").await;
        let (cookie, _, token) = library_session(&harness.app).await;

        let response = post_form(
            &harness.app,
            "/admin/media/bulk",
            Some(&cookie),
            format!("csrf_token={token}&action=delete&media={id}"),
        )
        .await;
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/admin/media");

        let response = post_form(
            &harness.app,
            "/admin/media/bulk",
            Some(&cookie),
            format!("action=generate_alt_text&media={id}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(alt_text_of(&harness.db, id).await, "");
    }

    #[tokio::test]
    async fn library_renders_bulk_notices() {
        let harness = setup().await;
        add_attachment(&harness.db, "first.png").await;

        let request = Request::builder()
            .uri("/admin/media?alt_generated=5&alt_failed=2")
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("Generated ALT text for 5 image(s)."));
        assert!(body.contains("Could not generate ALT text for 2 image(s)."));
        assert!(body.contains("/uploads/first.png"));

        let request = Request::builder()
            .uri("/admin/media")
            .body(Body::empty())
            .unwrap();
        let body = read_body(harness.app.clone().oneshot(request).await.unwrap()).await;
        assert!(!body.contains("Generated ALT text for"));
    }

    #[tokio::test]
    async fn settings_save_round_trips_key() {
        let harness = setup().await;
        let (cookie, token) = settings_session(&harness.app).await;

        let response = post_form(
            &harness.app,
            "/admin/settings",
            Some(&cookie),
            format!("csrf_token={token}&api_key=sk-or-v1-abc"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            crate::settings::get_api_key(&harness.db).await.unwrap(),
            "sk-or-v1-abc"
        );

        let request = Request::builder()
            .uri("/admin/settings")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = read_body(harness.app.clone().oneshot(request).await.unwrap()).await;
        assert!(body.contains("Settings saved."));
        assert!(body.contains("value=\"sk-or-v1-abc\""));
    }

    #[tokio::test]
    async fn settings_save_requires_token() {
        let harness = setup().await;
        let response = post_form(
            &harness.app,
            "/admin/settings",
            None,
            "api_key=sk-or-v1-abc".to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(crate::settings::get_api_key(&harness.db).await.unwrap(), "");
    }

    #[tokio::test]
    async fn manual_save_persists_alt_text() {
        let harness = setup().await;
        let id = add_attachment(&harness.db, "cat.png").await;
        let (cookie, nonce, token) = attachment_session(&harness.app, id).await;

        let response = post_form(
            &harness.app,
            &format!("/admin/media/{id}"),
            Some(&cookie),
            format!("csrf_token={token}&alt_text=A+tabby+cat"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(alt_text_of(&harness.db, id).await, "A tabby cat");

        let request = Request::builder()
            .uri(format!("/admin/media/{id}"))
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        let body = read_body(response).await;
        assert!(body.contains("ALT text saved."));
        assert!(body.contains("data-altgen-button"));
        assert!(body.contains(&format!("data-altgen-nonce=\"{nonce}\"")));
    }

    #[tokio::test]
    async fn missing_attachment_is_404() {
        let harness = setup().await;
        let request = Request::builder()
            .uri("/admin/media/77")
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_stores_and_serves_image() {
        let harness = setup().await;
        let (cookie, token, _) = library_session(&harness.app).await;

        let boundary = "altgen-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{token}\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nRed square\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"red.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&uploads::sample_png());
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/admin/media/upload")
            .header(COOKIE, &cookie)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let stored = attachments::Entity::newest_first(harness.db.as_ref())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Red square");
        assert_eq!(stored[0].mime_type, "image/png");
        assert_eq!(
            response.headers().get(LOCATION).unwrap().to_str().unwrap(),
            format!("/admin/media/{}", stored[0].id)
        );

        let request = Request::builder()
            .uri(format!("/uploads/{}", stored[0].filename))
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
        let etag = response.headers().get("etag").unwrap().clone();

        let request = Request::builder()
            .uri(format!("/uploads/{}", stored[0].filename))
            .header("if-none-match", etag)
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn upload_rejects_non_images() {
        let harness = setup().await;
        let (cookie, token, _) = library_session(&harness.app).await;

        let boundary = "altgen-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{token}\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nnot an image\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/admin/media/upload")
            .header(COOKIE, &cookie)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            attachments::Entity::newest_first(harness.db.as_ref())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn tokens_only_authorize_their_own_action() {
        let harness = setup().await;
        crate::settings::set_api_key(&harness.db, "sk-or-test")
            .await
            .unwrap();
        let id = add_attachment(&harness.db, "cat.png").await;
        let (cookie, settings_token) = settings_session(&harness.app).await;
        let (_, body) =
            load_page(&harness.app, &format!("/admin/media/{id}"), Some(&cookie)).await;
        let nonce = token_after(&body, "data-altgen-nonce=\"");
        assert_ne!(nonce, settings_token);

        let response = post_form(
            &harness.app,
            "/admin/ajax/generate-alt",
            Some(&cookie),
            format!("attachment_id={id}&security={settings_token}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);

        let response = post_form(
            &harness.app,
            "/admin/settings",
            Some(&cookie),
            format!("csrf_token={nonce}&api_key=replaced"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            crate::settings::get_api_key(&harness.db).await.unwrap(),
            "sk-or-test"
        );

        let response = post_form(
            &harness.app,
            "/admin/media/bulk",
            Some(&cookie),
            format!("csrf_token={nonce}&action=generate_alt_text&media={id}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(alt_text_of(&harness.db, id).await, "");

        // each token still works where it was issued
        let response = post_form(
            &harness.app,
            "/admin/ajax/generate-alt",
            Some(&cookie),
            format!("attachment_id={id}&security={nonce}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_upload_insert_removes_stored_file() {
        let harness = setup().await;
        let (cookie, token, _) = library_session(&harness.app).await;
        harness
            .db
            .execute_unprepared("DROP TABLE attachments")
            .await
            .expect("drop table");

        let boundary = "altgen-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{token}\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"red.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&uploads::sample_png());
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/admin/media/upload")
            .header(COOKIE, &cookie)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let leftover = std::fs::read_dir(harness.upload_dir.path())
            .expect("read upload dir")
            .count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn static_assets_are_served() {
        let harness = setup().await;
        let request = Request::builder()
            .uri("/static/admin.js")
            .body(Body::empty())
            .unwrap();
        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("data-altgen-button"));
    }
}
