pub mod api;
pub mod auth;
pub mod files;
pub mod server;

pub use api::{ApiError, AppState};
pub use server::{create_router, run_server};
