//! Usage: Local HTTP server that receives the OAuth redirect.

pub mod listen;
pub mod manager;
pub(crate) mod routes;

pub use listen::{parse_listen_address, ListenAddress};
pub use manager::{CallbackServer, RunningServer, DEFAULT_SHUTDOWN_GRACE};
pub use routes::validate_callback_path;
