//! # Mailcanvas CSS
//!
//! Small typed model of the CSS the editor manipulates:
//!
//! - [`DeclarationList`]: ordered `property: value` pairs with unique keys
//! - [`shorthand`]: `padding`/`margin` expansion for editing forms and collapse on save
//! - [`StyleSheet`]: the embedded `<style>` block, keyed by selector
//!
//! Parsing is forgiving: anything that is not a plain rule (at-rules, comments)
//! is carried through untouched.

pub mod declarations;
pub mod shorthand;
pub mod stylesheet;

pub use declarations::{Declaration, DeclarationList};
pub use shorthand::{collapse_box_shorthands, expand_box_shorthands, BoxSides};
pub use stylesheet::{SheetItem, StyleRule, StyleSheet};
