//! Notification Module
//!
//! User-facing side effects of failed requests, modeled as an injected
//! trait so the transport core never reaches into UI state directly.

use tracing::{error, warn};

use crate::error::ErrorCategory;

// == Notifier Trait ==
/// Sink for the client's user-visible side effects.
pub trait Notifier: Send + Sync {
    /// Surfaces one failure notification. Called at most once per original
    /// caller invocation, never once per retry. Suppressed entirely for
    /// `silent` requests.
    fn error(&self, category: ErrorCategory, message: &str);

    /// Signals that the session is gone and the application should route
    /// the user to its login entry point. Not suppressed by `silent`.
    fn session_expired(&self);
}

// == Tracing Notifier ==
/// Default notifier that reports through the tracing pipeline.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, category: ErrorCategory, message: &str) {
        error!(?category, message, "Request failed");
    }

    fn session_expired(&self) {
        warn!("Session expired; login required");
    }
}
