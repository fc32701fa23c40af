//! HTTP surface for Sympta.
//!
//! Exposes chat CRUD and the per-turn message endpoint over axum. All
//! reasoning happens in `sympta-chat`; this crate only validates input,
//! serializes turns on the same chat, and persists what the orchestrator
//! hands back.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
