use async_trait::async_trait;

use crate::BoxError;

/// Source of bearer tokens for authenticated backend calls. Token
/// acquisition and refresh live with the session/auth provider; this
/// trait is only the seam the HTTP client pulls from.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, BoxError>;
}

/// Fixed token, for tests and short-lived CLI use.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, BoxError> {
        Ok(self.token.clone())
    }
}
