//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] mailcanvas_protocol::ProtocolError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Unknown skeleton: {0} (expected \"email\" or \"popup\")")]
    UnknownSkeleton(String),

    #[error("Nothing to {0}")]
    EmptyHistory(&'static str),
}
