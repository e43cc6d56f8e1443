//! # chathub-api
//!
//! HTTP API layer for ChatHub built on Axum.
//!
//! Provides the WebSocket upgrade endpoint, the chat-send endpoint that
//! feeds the notification bridge, the health endpoint, and error mapping.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
