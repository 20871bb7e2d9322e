//! Lifetime scope shared by long-lived connections

use tokio_util::sync::CancellationToken;

/// Scope that outlives individual requests
///
/// Cancelling it ends every session built under it. Sessions hold child
/// tokens, so ending one session never ends its siblings.
#[derive(Debug, Clone, Default)]
pub struct Lifetime {
    token: CancellationToken,
}

impl Lifetime {
    /// Create a new, live scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Token for one session under this scope
    pub fn child(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// End the scope
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the scope has ended
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the scope ends
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
