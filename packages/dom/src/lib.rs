//! # Mailcanvas DOM
//!
//! Document model for the structural template editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ html string (canonical document)            │
//! └─────────────────────────────────────────────┘
//!                     ↓ parse (html5ever)
//! ┌─────────────────────────────────────────────┐
//! │ Tree: owned arena of nodes                  │
//! │  - parent links for scope checks            │
//! │  - detach / insert / deep clone             │
//! │  - selectors (generate + resolve)           │
//! └─────────────────────────────────────────────┘
//!                     ↓ serialize
//! ┌─────────────────────────────────────────────┐
//! │ html string (deterministic)                 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Parsing never fails: bare fragments are wrapped in a minimal skeleton and
//! malformed markup goes through the standard HTML recovery rules.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mailcanvas_dom::{parse, serialize, selector};
//!
//! let tree = parse("<p class=\"mc-el-1\">Hi</p>");
//! let p = tree.find_first(tree.document(), |t, id| t.tag(id) == Some("p")).unwrap();
//! let sel = selector::generate(&tree, p).unwrap();
//! assert_eq!(selector::resolve(&tree, &sel), Some(p));
//! let html = serialize(&tree);
//! ```

pub mod error;
pub mod id_generator;
pub mod markers;
pub mod parser;
pub mod selector;
pub mod serializer;
pub mod tree;

#[cfg(test)]
mod tests_roundtrip;

pub use error::DomError;
pub use id_generator::{get_session_seed, IdGenerator};
pub use parser::{parse, parse_fragment_into};
pub use selector::{PathSegment, Selector};
pub use serializer::{inner_html, outer_html, serialize};
pub use tree::{Attributes, NodeId, NodeKind, Tree};
