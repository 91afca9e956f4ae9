use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mailcanvas_editor::EditorError;
use mailcanvas_preview::ComposeError;
use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Preview error: {0}")]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Editor controller is not running")]
    ControllerGone,
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl WorkspaceError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkspaceError::Editor(EditorError::EmptyHistory(_)) => StatusCode::CONFLICT,
            WorkspaceError::Editor(_) => StatusCode::BAD_REQUEST,
            WorkspaceError::Compose(ComposeError::InvalidViewport(_)) => StatusCode::BAD_REQUEST,
            WorkspaceError::Compose(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkspaceError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            WorkspaceError::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            WorkspaceError::Store(StoreError::UnsupportedImage(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            WorkspaceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WorkspaceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WorkspaceError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkspaceError::ControllerGone => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
