//! Editing session service: one controller task per session, an HTTP/SSE
//! API for the editor shell, and the storage collaborators behind it.

pub mod controller;
pub mod error;
pub mod server;
pub mod storage;

pub use controller::{ControllerHandle, DocumentSnapshot};
pub use error::{WorkspaceError, WorkspaceResult};
pub use server::{router, serve, AppState};
pub use storage::{
    DirImageStore, FileTemplateStore, ImageStore, MemoryShareLinks, ShareLinks, StoreError,
    StoreResult, TemplateMeta, TemplateStore,
};
