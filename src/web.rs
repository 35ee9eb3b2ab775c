//! HTTP surface: kiosk display page, admin upload/delete, JSON listing, and
//! static serving of the stored photo bytes.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json, Redirect};
use axum::routing::{get, post};
use axum::Router;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::events::{PHOTO_ROUTE, SAFE_PATH_SEGMENT, photo_url};
use crate::state::KioskState;
use crate::store::sanitize_file_name;
use crate::ws;

/// Upload bodies above this size are rejected before the handler runs.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// State injected into every handler via the axum `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub kiosk: KioskState,
    pub tick_period: Duration,
    /// Start-once barrier for the slideshow scheduler; resolved by the
    /// first kiosk connection.
    pub scheduler_started: Arc<OnceCell<()>>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(kiosk: KioskState, tick_period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            kiosk,
            tick_period,
            scheduler_started: Arc::new(OnceCell::new()),
            shutdown,
        }
    }
}

pub fn router(app: AppState) -> Router {
    let images = ServeDir::new(app.kiosk.store().root());
    Router::new()
        .route("/", get(kiosk_page))
        .route("/kiosk", get(kiosk_page))
        .route("/admin", get(admin_page))
        .route("/upload", post(upload_photo))
        .route("/delete/{filename}", post(delete_photo))
        .route("/api/images", get(list_images))
        .route("/ws", get(ws::handle_ws))
        .nest_service(PHOTO_ROUTE, images)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

pub async fn serve(addr: SocketAddr, app: AppState) -> Result<()> {
    let shutdown = app.shutdown.clone();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind kiosk listener on {addr}"))?;
    info!(%addr, "kiosk server listening");

    axum::serve(listener, router(app).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("kiosk server exited")?;
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            term.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ---------------------------------------------------------------------------
// Kiosk display page
// ---------------------------------------------------------------------------

async fn kiosk_page() -> Html<String> {
    Html(kiosk_html())
}

fn kiosk_html() -> String {
    format!(
        "<!doctype html><html lang='en'><head><meta charset='utf-8'>\
<meta name='viewport' content='width=device-width,initial-scale=1'>\
<title>Photo Kiosk</title><style>{styles}</style></head>\
<body><main><img id='photo' alt='' hidden><p id='idle'>Waiting for photos\u{2026}</p></main>\
<script>{script}</script></body></html>",
        styles = KIOSK_STYLES,
        script = KIOSK_SCRIPT
    )
}

const KIOSK_STYLES: &str = "html, body { margin: 0; height: 100%; background: #000; }\n\
main { height: 100%; display: flex; align-items: center; justify-content: center; }\n\
img { max-width: 100%; max-height: 100%; object-fit: contain; }\n\
p { color: #666; font-family: sans-serif; font-size: 1.2rem; }";

const KIOSK_SCRIPT: &str = "(function () {\n\
  var img = document.getElementById('photo');\n\
  var idle = document.getElementById('idle');\n\
  function connect() {\n\
    var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';\n\
    var ws = new WebSocket(proto + location.host + '/ws');\n\
    ws.onmessage = function (msg) {\n\
      var data = JSON.parse(msg.data);\n\
      if (data.event === 'update_image') {\n\
        img.src = data.url;\n\
        img.hidden = false;\n\
        idle.hidden = true;\n\
      }\n\
    };\n\
    ws.onclose = function () { setTimeout(connect, 2000); };\n\
  }\n\
  connect();\n\
})();";

// ---------------------------------------------------------------------------
// Admin surface
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AdminParams {
    notice: Option<String>,
}

async fn admin_page(
    State(app): State<AppState>,
    Query(params): Query<AdminParams>,
) -> Html<String> {
    let photos = app.kiosk.store().list();
    Html(layout(&render_admin(&photos, params.notice.as_deref())))
}

fn render_admin(photos: &[String], notice: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Photo Kiosk Admin</h1>");
    if let Some(notice) = notice {
        writeln!(
            &mut body,
            "<p class=\"notice\">{}</p>",
            escape_html(notice)
        )
        .ok();
    }
    body.push_str(
        "<section class=\"upload\"><h2>Upload</h2>\
<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
<input type=\"file\" name=\"file\" accept=\"image/*\" required> \
<button type=\"submit\">Upload</button></form></section>",
    );
    body.push_str("<section class=\"photos\"><h2>Photos</h2>");
    if photos.is_empty() {
        body.push_str("<p>No photos yet. Upload one to start the slideshow.</p>");
    } else {
        body.push_str("<table><thead><tr><th>Preview</th><th>Name</th><th></th></tr></thead><tbody>");
        for name in photos {
            let encoded = utf8_percent_encode(name, SAFE_PATH_SEGMENT).to_string();
            body.push_str("<tr>");
            body.push_str(&format!(
                "<td><img class=\"thumb\" src=\"{}\" alt=\"\"></td>",
                escape_html(&photo_url(name))
            ));
            body.push_str(&format!("<td>{}</td>", escape_html(name)));
            body.push_str(&format!(
                "<td><form method=\"post\" action=\"/delete/{encoded}\" \
onsubmit=\"return confirm('Delete {}?');\">\
<button type=\"submit\" class=\"danger\">Delete</button></form></td>",
                escape_html(name)
            ));
            body.push_str("</tr>");
        }
        body.push_str("</tbody></table>");
    }
    body.push_str("</section><p><a href=\"/kiosk\">Open kiosk view</a></p>");
    body
}

async fn upload_photo(
    State(app): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let stored = store_upload(&app, multipart)
        .await
        .map_err(|err| reject(&err))?;
    Ok(admin_redirect(&format!("Added \"{stored}\".")))
}

/// Pull the `file` field out of the multipart body, validate it, and write
/// it to storage. Nothing is persisted on any validation failure.
async fn store_upload(app: &AppState, mut multipart: Multipart) -> Result<String, Error> {
    let store = app.kiosk.store();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| Error::Validation(format!("malformed upload: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Validation("no file selected".to_string()))?;
        if !store.allowed_extension(&original) {
            return Err(Error::Validation(format!(
                "file type of \"{original}\" is not allowed"
            )));
        }
        let name = sanitize_file_name(&original)
            .ok_or_else(|| Error::Validation(format!("unusable file name \"{original}\"")))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| Error::Validation(format!("failed to read upload: {err}")))?;
        if bytes.is_empty() {
            return Err(Error::Validation("no file selected".to_string()));
        }
        store.save(&name, &bytes)?;
        info!(file = %name, size = bytes.len(), "photo uploaded");
        app.kiosk.refresh().await;
        return Ok(name);
    }
    Err(Error::Validation("no file selected".to_string()))
}

async fn delete_photo(
    State(app): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let removed = remove_photo(&app, &filename)
        .await
        .map_err(|err| reject(&err))?;
    Ok(admin_redirect(&format!("Deleted \"{removed}\".")))
}

/// Remove a photo by its exact stored name. A name whose sanitized form
/// differs from the input is refused outright; storage stays untouched.
async fn remove_photo(app: &AppState, filename: &str) -> Result<String, Error> {
    match sanitize_file_name(filename) {
        Some(safe) if safe == filename => {
            app.kiosk.store().remove(&safe)?;
            info!(file = %safe, "photo deleted");
            app.kiosk.refresh().await;
            Ok(safe)
        }
        _ => Err(Error::Validation(format!(
            "unsafe file name \"{filename}\""
        ))),
    }
}

async fn list_images(State(app): State<AppState>) -> Json<Vec<String>> {
    let urls = app
        .kiosk
        .store()
        .list()
        .iter()
        .map(|name| photo_url(name))
        .collect();
    Json(urls)
}

// ---------------------------------------------------------------------------
// Shared rendering helpers
// ---------------------------------------------------------------------------

fn admin_redirect(notice: &str) -> Redirect {
    let encoded = utf8_percent_encode(notice, NON_ALPHANUMERIC).to_string();
    Redirect::to(&format!("/admin?notice={encoded}"))
}

fn reject(err: &Error) -> (StatusCode, Html<String>) {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "admin operation failed");
    } else {
        warn!(error = %err, "admin request rejected");
    }
    let body = format!(
        "<h2>Request failed</h2><p>{}</p><p><a href=\"/admin\">Back to admin</a></p>",
        escape_html(&err.to_string())
    );
    (status, Html(layout(&body)))
}

fn layout(body: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>Photo Kiosk Admin</title><style>{}</style></head>\
<body><main>{}</main></body></html>",
        ADMIN_STYLES, body
    )
}

const ADMIN_STYLES: &str = "body { font-family: sans-serif; margin: 0; padding: 0; background: #f5f5f5; color: #222; }\n\
main { max-width: 720px; margin: 0 auto; padding: 24px; background: #fff; min-height: 100vh; box-sizing: border-box; }\n\
h1, h2 { margin-top: 0; }\n\
table { width: 100%; border-collapse: collapse; margin-top: 12px; }\n\
th, td { border-bottom: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: middle; }\n\
img.thumb { max-width: 96px; max-height: 64px; }\n\
form { display: inline-block; margin: 0; }\n\
form button { padding: 6px 12px; border-radius: 4px; border: 1px solid #1976d2; background: #2196f3; color: #fff; cursor: pointer; }\n\
form button.danger { border-color: #b71c1c; background: #d32f2f; }\n\
.notice { background: #e8f5e9; color: #2e7d32; padding: 12px; border-radius: 4px; }\n\
section { margin-bottom: 24px; }";

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
