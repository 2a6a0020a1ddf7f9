//! Client context resolver with a fixed origin, for embedding contexts that
//! establish the caller's network identity once per session.

use async_trait::async_trait;
use clinicore_application::{ClientContext, ClientContextResolver};
use clinicore_core::AppResult;

/// Resolver returning one fixed client context.
#[derive(Clone)]
pub struct StaticClientContextResolver {
    context: ClientContext,
}

impl StaticClientContextResolver {
    /// Creates a resolver for a known origin and agent string.
    #[must_use]
    pub fn new(ip_address: impl Into<String>, client_agent: impl Into<String>) -> Self {
        Self {
            context: ClientContext {
                ip_address: ip_address.into(),
                client_agent: client_agent.into(),
            },
        }
    }
}

impl Default for StaticClientContextResolver {
    /// Resolver reporting `"unknown"` for both fields.
    fn default() -> Self {
        Self {
            context: ClientContext::unknown(),
        }
    }
}

#[async_trait]
impl ClientContextResolver for StaticClientContextResolver {
    async fn resolve(&self) -> AppResult<ClientContext> {
        Ok(self.context.clone())
    }
}
