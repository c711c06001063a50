//! Token acquisition seam.
//!
//! How tokens are obtained is up to the application; the cloud providers
//! only ask for the current token and for a fresh one after a `401`.

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::Result;

/// Supplies bearer tokens for cloud requests.
pub trait TokenProvider {
    /// Current access token.
    fn token(&self) -> LocalBoxFuture<'_, Result<String>>;

    /// Discard the current token and obtain a new one.
    fn reauthenticate(&self) -> LocalBoxFuture<'_, Result<String>>;
}

/// A fixed token that never changes.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Provider that always hands out `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> LocalBoxFuture<'_, Result<String>> {
        future::ready(Ok(self.token.clone())).boxed_local()
    }

    fn reauthenticate(&self) -> LocalBoxFuture<'_, Result<String>> {
        self.token()
    }
}
