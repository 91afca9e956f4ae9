//! # Mailcanvas Editor
//!
//! Structural editing engine for HTML email and popup templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ surface: rendered document + bridge script  │
//! └─────────────────────────────────────────────┘
//!                     ↓ SurfaceMessage
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - Resolve selectors and drop targets       │
//! │  - Apply mutations inside the root scope    │
//! │  - Sync styles into the managed stylesheet  │
//! │  - Restore placeholders, prune orphan rules │
//! │  - Undo/redo over committed snapshots       │
//! └─────────────────────────────────────────────┘
//!                     ↓ ControllerEvent
//! ┌─────────────────────────────────────────────┐
//! │ workspace: preview composition + transport  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The serialized document is the source of truth**: every mutation
//!    parses it, edits a working copy, and commits the re-serialized result
//! 2. **All or nothing**: a rejected mutation commits nothing
//! 3. **Root scope confinement**: nothing outside `.mc-root` is ever touched
//! 4. **No inline styles**: element styling lives in one managed stylesheet
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mailcanvas_editor::{EditSession, Mutation, SessionSettings, Skeleton};
//!
//! let mut session = EditSession::with_skeleton("tpl-1", Skeleton::Email, SessionSettings::default());
//!
//! session.apply(&Mutation::Inject {
//!     snippet: "<h1 style=\"color: red\">Hello</h1>".to_string(),
//!     target: None,
//!     position: DropPosition::Inside,
//! });
//!
//! let events = session.handle_json(r#"{"type":"element-deselected"}"#)?;
//! ```

mod document;
mod errors;
mod mutations;
mod post_effects;
mod session;
mod undo_stack;

pub mod drop_target;
pub mod placeholder;
pub mod scope;
pub mod style_sync;

pub use document::{Document, Skeleton};
pub use errors::EditorError;
pub use mutations::{MoveDirection, Mutation, MutationContext, MutationError, MutationResult};
pub use post_effects::{PostEffect, PostEffectEngine};
pub use session::{EditSession, SessionSettings};
pub use undo_stack::{Snapshot, UndoStack};

// Re-export wire types for convenience
pub use mailcanvas_protocol::{ControllerEvent, DropPosition, SurfaceMessage};
