//! Usage: Process-level wiring: configuration, logging and the run loop.

pub mod config;
pub mod logging;
pub mod run;

pub use config::AppConfig;
