//! Auth Session Module
//!
//! Token lifecycle for the API client: expose the current bearer token,
//! refresh it on demand, and tear the session down when refresh fails.
//!
//! Concurrent refresh calls are coalesced into a single underlying
//! round-trip. Two requests hitting a 401 at the same moment must not both
//! spend the refresh token; the second caller waits for the first refresh
//! and reuses its outcome.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

// == Auth Provider Trait ==
/// The authentication contract the HTTP client consumes.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current bearer token, if a session is active.
    fn token(&self) -> Option<String>;

    /// Replaces the token with a freshly issued one.
    ///
    /// Returns true when a new token was installed; false means the session
    /// could not be renewed and has been cleared.
    async fn refresh(&self) -> bool;

    /// Discards the session token.
    fn clear(&self);
}

// == Token Refresher Trait ==
/// The refresh round-trip itself, injected so the session logic stays
/// independent of any particular transport.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtains a new token from the auth backend.
    async fn refresh_token(&self) -> Result<String>;
}

// == Auth Session ==
/// Shared token holder with single-flight refresh.
pub struct AuthSession {
    /// Current token; None once the session is torn down
    token: RwLock<Option<String>>,
    /// Bumped after every completed refresh cycle, success or failure
    generation: AtomicU64,
    /// Serializes refresh cycles so only one round-trip is in flight
    refresh_gate: Mutex<()>,
    /// The underlying refresh round-trip
    refresher: Box<dyn TokenRefresher>,
}

impl AuthSession {
    // == Constructors ==
    /// Creates a session with no token installed.
    pub fn new(refresher: Box<dyn TokenRefresher>) -> Self {
        Self {
            token: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_gate: Mutex::new(()),
            refresher,
        }
    }

    /// Creates a session pre-loaded with a token (e.g. from login).
    pub fn with_token(token: impl Into<String>, refresher: Box<dyn TokenRefresher>) -> Self {
        let session = Self::new(refresher);
        *session.token.write() = Some(token.into());
        session
    }

    // == Install Token ==
    /// Installs a token obtained outside the refresh flow (login).
    pub fn install_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for AuthSession {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn refresh(&self) -> bool {
        let entry_generation = self.generation.load(Ordering::SeqCst);

        let _gate = self.refresh_gate.lock().await;

        // A refresh cycle completed while we waited for the gate; adopt its
        // outcome instead of spending another refresh round-trip.
        if self.generation.load(Ordering::SeqCst) != entry_generation {
            return self.token().is_some();
        }

        let outcome = match self.refresher.refresh_token().await {
            Ok(token) => {
                debug!("Token refresh succeeded");
                *self.token.write() = Some(token);
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; clearing session");
                *self.token.write() = None;
                false
            }
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}
