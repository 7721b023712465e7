//! Re-authentication handler supplied by the host application.

use std::future::Future;

use async_trait::async_trait;

/// Error raised by a failed re-authentication.
pub type HandshakeError = Box<dyn std::error::Error + Send + Sync>;

/// Identity observed after re-authentication, compared to the one before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityCheck {
    Same,
    Different,
}

impl From<bool> for IdentityCheck {
    /// `true` means "a different identity logged in".
    fn from(different: bool) -> Self {
        if different {
            IdentityCheck::Different
        } else {
            IdentityCheck::Same
        }
    }
}

/// Runs one login handshake, typically interactive.
#[async_trait]
pub trait ReauthHandler: Send + Sync {
    async fn reauthenticate(&self) -> Result<IdentityCheck, HandshakeError>;
}

#[async_trait]
impl<F, Fut> ReauthHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<IdentityCheck, HandshakeError>> + Send,
{
    async fn reauthenticate(&self) -> Result<IdentityCheck, HandshakeError> {
        (self)().await
    }
}
