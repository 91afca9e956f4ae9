//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Node is not an element")]
    NotAnElement,
}
