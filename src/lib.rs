//! Visa Advisor - Application Library
//!
//! Streaming visa advisory service built on `visa-advisor-core` and
//! `visa-advisor-llm`. It includes:
//! - Reasoning tasks (research, document reading/analysis, advisory)
//! - The fan-in orchestrator that owns each request's event stream
//! - An axum HTTP server exposing the streams
//! - Configuration loading and the corridor data store

pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::AppConfig;
pub use server::{build_router, serve};
pub use services::Orchestrator;
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
