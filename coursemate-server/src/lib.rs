//! Coursemate HTTP service: document upload with background indexing,
//! page-cited question answering, and resume review context.

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::{ProviderKind, ServerConfig, SourcePolicy};
pub use error::ApiError;
pub use server::{app_router, run_server};
pub use state::AppState;
