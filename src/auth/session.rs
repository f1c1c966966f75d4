//! Caller identity resolution.
//!
//! Every action resolves its caller afresh from an explicit session value
//! handed in by the caller; nothing here is cached between calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::AuthSettings;
use crate::database::{ArcBackend, BackendResult};

/// Verified identity of whoever invokes an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Turns a session into a caller identity, consulting the backend as needed
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` means "no verified caller"; errors are backend faults only
    async fn resolve(&self, client: &ArcBackend) -> BackendResult<Option<CallerIdentity>>;
}

/// Resolver for requests that carry no session at all
pub struct AnonymousSession;

#[async_trait]
impl IdentityResolver for AnonymousSession {
    async fn resolve(&self, _client: &ArcBackend) -> BackendResult<Option<CallerIdentity>> {
        Ok(None)
    }
}

/// Resolves a signed session token against the account store
pub struct SessionResolver {
    token: Option<String>,
    settings: Arc<AuthSettings>,
}

impl SessionResolver {
    pub fn new(token: Option<String>, settings: Arc<AuthSettings>) -> Self {
        Self { token, settings }
    }
}

#[async_trait]
impl IdentityResolver for SessionResolver {
    async fn resolve(&self, client: &ArcBackend) -> BackendResult<Option<CallerIdentity>> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };

        let claims = match self.settings.validate_jwt(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("ignoring session token: {}", e);
                return Ok(None);
            }
        };

        // The token alone is not enough: the account must still exist and be confirmed
        let identity = client
            .find_user(claims.sub)
            .await?
            .filter(|user| user.is_confirmed())
            .map(|user| CallerIdentity {
                user_id: user.id,
                email: user.email,
                issued_at: claims.issued_at(),
                expires_at: claims.expires_at(),
            });

        if identity.is_none() {
            tracing::debug!(user_id = %claims.sub, "session token refers to an unknown or unconfirmed account");
        }
        Ok(identity)
    }
}
