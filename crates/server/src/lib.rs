//! HTTP surface for the brand clearance pipeline.
//!
//! `POST /api/search` runs one search behind a per-client rate limit,
//! `GET /health` reports liveness.

pub mod config;
mod error;
mod routes;
mod service;

pub use config::{Cli, ServerConfig};
pub use error::AppError;
pub use routes::{client_id, create_router, AppState};
pub use service::SearchService;
