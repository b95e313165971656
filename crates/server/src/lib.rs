pub mod advice;
pub mod config;
pub mod error;
pub mod routes;

pub use config::{LogFormat, ServerConfig};
pub use routes::{app, AppState};
