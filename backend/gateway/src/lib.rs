//! textlens gateway HTTP API server.
//!
//! Exposes status, model listing and extraction (plain and SSE) over axum.

pub mod error;
pub mod extract_api;
pub mod health_api;
pub mod server;
pub mod stream_api;

pub use error::{ApiError, ErrorBody};
pub use server::{body_limit, build_router, serve, start_server, GatewayState};
