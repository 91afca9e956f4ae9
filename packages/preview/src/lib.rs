//! # Mailcanvas Preview
//!
//! Turns the canonical template document into the page the editing surface
//! renders.
//!
//! ## Core Principles
//!
//! - Only the root scope and its stylesheets are shown
//! - Everything the composer adds is editor chrome (`mc-ui-*`) and never
//!   survives a round trip back into the canonical document
//! - Composition is pure: same document and options, same page
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mailcanvas_preview::{compose, PreviewOptions, Viewport};
//!
//! let options = PreviewOptions {
//!     viewport: Viewport::Mobile,
//!     ..PreviewOptions::interactive()
//! };
//! let page = compose(r#"<div class="mc-root"><p>Hi</p></div>"#, &options).unwrap();
//! assert!(page.contains("mc-ui-bridge"));
//! ```

mod compose;
mod viewport;

pub use compose::{compose, PreviewOptions, BRIDGE_SCRIPT};
pub use viewport::Viewport;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("Document has no root scope")]
    NoRootScope,

    #[error("Document has {0} root scopes; expected exactly one")]
    AmbiguousRootScope(usize),

    #[error("Invalid viewport: {0} (expected mobile, tablet, desktop or WIDTHxHEIGHT)")]
    InvalidViewport(String),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
