//! Application state shared across all handlers.

use std::sync::Arc;

use chathub_core::config::AppConfig;
use chathub_core::traits::{MessageStore, TokenVerifier};
use chathub_realtime::{Notifier, RealtimeEngine};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// WebSocket realtime engine.
    pub engine: Arc<RealtimeEngine>,
    /// Notification bridge into room fan-out.
    pub notifier: Notifier,
    /// External token verifier.
    pub verifier: Arc<dyn TokenVerifier>,
    /// External message repository.
    pub messages: Arc<dyn MessageStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish()
    }
}

impl AppState {
    /// Builds the state around an engine and its collaborators.
    pub fn new(
        config: Arc<AppConfig>,
        engine: Arc<RealtimeEngine>,
        verifier: Arc<dyn TokenVerifier>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let notifier = engine.notifier();
        Self {
            config,
            engine,
            notifier,
            verifier,
            messages,
        }
    }
}
