pub mod app;
pub mod mailbox;
pub mod oauth;
pub mod server;
pub mod shared;

pub use shared::error::{AppError, AppResult};
