pub mod init;
pub mod preview;
pub mod serve;

pub use init::{init, InitArgs};
pub use preview::{preview, PreviewArgs};
pub use serve::{serve, ServeArgs};
