//! Read-only HTTP API over the observation log and live monitor status

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{bind, build_router, serve};
