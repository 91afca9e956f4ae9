//! HTTP API for the editor shell
//!
//! | route | purpose |
//! |---|---|
//! | `GET /` | editor shell page |
//! | `GET /api/preview` | composed document (`?viewport=`, `?overlay=`, `?interactive=`) |
//! | `PUT /api/preview/options` | options used for broadcast renders |
//! | `GET /api/events` | server-sent controller events |
//! | `GET`/`PUT /api/document` | canonical document |
//! | `POST /api/message` | surface message |
//! | `POST /api/mutation` | direct mutation |
//! | `POST /api/undo`, `POST /api/redo` | history |
//! | `GET`/`POST /api/templates`, `GET /api/templates/:id` | template storage |
//! | `POST /api/images?selector=&name=` | image upload, sets `src` |
//! | `POST /api/share`, `GET /share/:token` | share links |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Html;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use mailcanvas_editor::{Mutation, MutationResult, SurfaceMessage};
use mailcanvas_preview::{compose, PreviewOptions, Viewport};
use mailcanvas_protocol::{ControllerEvent, NoticeLevel};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::controller::{ControllerHandle, DocumentSnapshot};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::storage::{ImageStore, ShareLinks, TemplateMeta, TemplateStore};

const SHELL_PAGE: &str = include_str!("shell.html");
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
    pub templates: Arc<dyn TemplateStore>,
    pub images: Arc<dyn ImageStore>,
    pub shares: Arc<dyn ShareLinks>,
    /// Directory served under `/uploads`
    pub uploads_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.uploads_dir);
    Router::new()
        .route("/", get(shell))
        .route("/api/preview", get(preview))
        .route("/api/preview/options", put(set_preview_options))
        .route("/api/events", get(events))
        .route("/api/document", get(document).put(replace_document))
        .route("/api/message", post(message))
        .route("/api/mutation", post(mutation))
        .route("/api/undo", post(undo))
        .route("/api/redo", post(redo))
        .route("/api/templates", get(list_templates).post(save_template))
        .route("/api/templates/:id", get(load_template))
        .route(
            "/api/images",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/share", post(create_share))
        .route("/share/:token", get(open_share))
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Editor shell on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn shell() -> Html<&'static str> {
    Html(SHELL_PAGE)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PreviewQuery {
    pub viewport: Option<String>,
    pub overlay: Option<String>,
    pub interactive: Option<bool>,
}

async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> WorkspaceResult<Html<String>> {
    let viewport = match query.viewport.as_deref() {
        Some(v) => v.parse::<Viewport>()?,
        None => Viewport::default(),
    };
    let options = PreviewOptions {
        external_page_url: query.overlay.filter(|u| !u.trim().is_empty()),
        viewport,
        interactive: query.interactive.unwrap_or(true),
        ..PreviewOptions::default()
    };
    Ok(Html(state.controller.preview(Some(options)).await?))
}

async fn set_preview_options(
    State(state): State<AppState>,
    Json(options): Json<PreviewOptions>,
) -> WorkspaceResult<Json<PreviewOptions>> {
    // Broadcast renders always drive the editing surface
    let options = PreviewOptions {
        interactive: true,
        ..options
    };
    state.controller.set_preview_options(options.clone()).await?;
    Ok(Json(options))
}

/// SSE stream: the current render first, then every controller event
async fn events(
    State(state): State<AppState>,
) -> WorkspaceResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let updates = BroadcastStream::new(state.controller.subscribe());
    let snapshot = state.controller.snapshot().await?;
    let initial = match state.controller.preview(None).await {
        Ok(page) => ControllerEvent::Render {
            document: page,
            version: snapshot.version,
        },
        Err(err) => ControllerEvent::error(err.to_string()),
    };
    info!(version = snapshot.version, "Event stream opened");

    let updates = updates.filter_map(|update| match update {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            warn!("[SSE] Subscriber lagged by {} messages", n);
            None
        }
    });
    let stream = stream::once(async move { initial })
        .chain(updates)
        .map(|event| Ok(sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

fn sse_event(event: &ControllerEvent) -> Event {
    let data = event.to_json().unwrap_or_else(|err| {
        warn!(error = %err, "Event could not be encoded");
        String::from("{}")
    });
    Event::default().event(event.kind()).data(data)
}

async fn document(State(state): State<AppState>) -> WorkspaceResult<Json<DocumentSnapshot>> {
    Ok(Json(state.controller.snapshot().await?))
}

#[derive(Debug, Deserialize)]
pub struct DocumentBody {
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct VersionBody {
    pub version: u64,
}

async fn replace_document(
    State(state): State<AppState>,
    Json(body): Json<DocumentBody>,
) -> WorkspaceResult<Json<VersionBody>> {
    let version = state.controller.load(body.html).await?;
    Ok(Json(VersionBody { version }))
}

/// Body is read raw so malformed messages surface as protocol errors
async fn message(
    State(state): State<AppState>,
    body: String,
) -> WorkspaceResult<Json<Vec<ControllerEvent>>> {
    let message = SurfaceMessage::from_json(&body).map_err(mailcanvas_editor::EditorError::from)?;
    Ok(Json(state.controller.message(message).await?))
}

async fn mutation(
    State(state): State<AppState>,
    Json(mutation): Json<Mutation>,
) -> WorkspaceResult<Json<MutationResult>> {
    Ok(Json(state.controller.apply(mutation).await?))
}

async fn undo(State(state): State<AppState>) -> WorkspaceResult<Json<VersionBody>> {
    let version = state.controller.undo().await?;
    Ok(Json(VersionBody { version }))
}

async fn redo(State(state): State<AppState>) -> WorkspaceResult<Json<VersionBody>> {
    let version = state.controller.redo().await?;
    Ok(Json(VersionBody { version }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaveTemplateBody {
    pub name: Option<String>,
}

async fn save_template(
    State(state): State<AppState>,
    Json(body): Json<SaveTemplateBody>,
) -> WorkspaceResult<Json<TemplateMeta>> {
    let snapshot = state.controller.snapshot().await?;
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Untitled {}", chrono::Utc::now().format("%Y-%m-%d %H:%M")));
    match state.templates.save(&snapshot.document, &name) {
        Ok(meta) => {
            state
                .controller
                .notify(NoticeLevel::Info, format!("Saved \"{}\"", meta.name))
                .await?;
            Ok(Json(meta))
        }
        Err(err) => {
            state
                .controller
                .notify(NoticeLevel::Error, format!("Save failed: {}", err))
                .await?;
            Err(err.into())
        }
    }
}

async fn list_templates(State(state): State<AppState>) -> WorkspaceResult<Json<Vec<TemplateMeta>>> {
    Ok(Json(state.templates.list()?))
}

async fn load_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WorkspaceResult<Json<VersionBody>> {
    let html = state.templates.load(&id)?;
    let version = state.controller.load(html).await?;
    info!(id = %id, version, "Template loaded into session");
    Ok(Json(VersionBody { version }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub selector: String,
    #[serde(default = "default_upload_name")]
    pub name: String,
}

fn default_upload_name() -> String {
    "upload.png".to_string()
}

#[derive(Debug, Serialize)]
pub struct UploadBody {
    pub url: String,
    pub result: MutationResult,
}

/// Store the image, then point the element's `src` at it
async fn upload_image(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    bytes: Bytes,
) -> WorkspaceResult<Json<UploadBody>> {
    if bytes.is_empty() {
        return Err(WorkspaceError::BadRequest("Empty upload".to_string()));
    }
    let url = match state.images.upload(&query.name, &bytes) {
        Ok(url) => url,
        Err(err) => {
            state
                .controller
                .notify(NoticeLevel::Error, format!("Image upload failed: {}", err))
                .await?;
            return Err(err.into());
        }
    };

    let result = state
        .controller
        .apply(Mutation::SetAttribute {
            selector: query.selector,
            name: "src".to_string(),
            value: Some(url.clone()),
        })
        .await?;
    Ok(Json(UploadBody { url, result }))
}

#[derive(Debug, Serialize)]
pub struct ShareBody {
    pub token: String,
    pub url: String,
}

async fn create_share(State(state): State<AppState>) -> WorkspaceResult<Json<ShareBody>> {
    let snapshot = state.controller.snapshot().await?;
    let token = state.shares.create(&snapshot.document);
    Ok(Json(ShareBody {
        url: format!("/share/{}", token),
        token,
    }))
}

/// Read-only preview of a shared snapshot
async fn open_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> WorkspaceResult<Html<String>> {
    let html = state
        .shares
        .resolve(&token)
        .ok_or_else(|| WorkspaceError::NotFound(format!("share link {}", token)))?;
    Ok(Html(compose(&html, &PreviewOptions::default())?))
}
