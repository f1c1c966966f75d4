use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tracing::subscriber::DefaultGuard;
use uuid::Uuid;

use crate::actions::ActionContext;
use crate::auth::{AuthSettings, CallerIdentity, IdentityResolver};
use crate::database::models::{EventInput, NewUser, User, VenueInput};
use crate::database::{ArcBackend, Backend, BackendError, BackendResult, MemoryBackend};

/// Resolver that hands back a fixed answer, or fails like a broken backend
pub struct FixedIdentity {
    identity: Option<CallerIdentity>,
    fail: bool,
}

impl FixedIdentity {
    pub fn of(identity: CallerIdentity) -> Self {
        Self {
            identity: Some(identity),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            identity: None,
            fail: true,
        }
    }
}

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self, _client: &ArcBackend) -> BackendResult<Option<CallerIdentity>> {
        if self.fail {
            return Err(BackendError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(self.identity.clone())
    }
}

/// An identity with no backing account
pub fn caller() -> CallerIdentity {
    identity_for(Uuid::new_v4(), "someone@example.com")
}

pub fn identity_for(user_id: Uuid, email: &str) -> CallerIdentity {
    let now = Utc::now();
    CallerIdentity {
        user_id,
        email: email.to_string(),
        issued_at: now,
        expires_at: now + Duration::hours(1),
    }
}

pub fn auth_settings(require_email_confirmation: bool) -> Arc<AuthSettings> {
    Arc::new(AuthSettings {
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_hours: 1,
        bcrypt_cost: 4,
        require_email_confirmation,
        app_url: "http://localhost:3000".to_string(),
    })
}

pub fn venue_input(name: &str, city: &str) -> VenueInput {
    VenueInput {
        name: name.to_string(),
        address: format!("{} Stadium Way", name.len()),
        city: city.to_string(),
        state: None,
        country: "US".to_string(),
        postal_code: Some("78701".to_string()),
    }
}

pub fn event_input(name: &str, sport_type: &str, day: u32, venue_ids: Vec<Uuid>) -> EventInput {
    EventInput {
        name: name.to_string(),
        sport_type: sport_type.to_string(),
        event_date: Utc.with_ymd_and_hms(2026, 7, day, 19, 30, 0).unwrap(),
        description: Some("Bring a flag".to_string()),
        venue_ids,
    }
}

/// Memory-backed fixture for action tests
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
        }
    }

    pub fn client(&self) -> ArcBackend {
        self.backend.clone()
    }

    pub fn anonymous(&self) -> ActionContext {
        ActionContext::anonymous(self.client())
    }

    pub fn as_caller(&self, identity: CallerIdentity) -> ActionContext {
        self.with_resolver(FixedIdentity::of(identity))
    }

    pub fn with_resolver(&self, resolver: impl IdentityResolver + 'static) -> ActionContext {
        ActionContext::new(self.client(), Arc::new(resolver))
    }

    /// Insert a confirmed account and return it with a matching identity
    pub async fn user(&self, email: &str) -> (User, CallerIdentity) {
        let user = self
            .backend
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                confirmed: true,
                verification_token_hash: None,
            })
            .await
            .expect("seed user");
        let identity = identity_for(user.id, &user.email);
        (user, identity)
    }

    pub async fn venue(&self, name: &str, city: &str) -> Uuid {
        self.backend
            .create_venue(&venue_input(name, city))
            .await
            .expect("seed venue")
            .id
    }
}

/// Log sink for asserting on what the wrapper writes
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route this thread's events here until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Log records emitted at ERROR level
    pub fn error_lines(&self) -> Vec<String> {
        let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.trim_start().starts_with("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
