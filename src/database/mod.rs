pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::EventFilter;
use models::{Event, EventInput, EventWithVenues, NewUser, User, Venue, VenueInput};

pub use manager::DatabaseManager;
pub use memory::MemoryBackend;
pub use postgres::PgBackend;

/// Errors surfaced by a `Backend` implementation
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

pub type ArcBackend = Arc<dyn Backend + Send + Sync + 'static>;

/// Typed client over the relational store.
///
/// Every method is scoped the way the row-level policies of a hosted store
/// would be: owner-scoped mutations take the caller's user id and only touch
/// rows owned by it.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn health_check(&self) -> BackendResult<()>;

    // Accounts
    async fn create_user(&self, user: NewUser) -> BackendResult<User>;
    async fn find_user(&self, id: Uuid) -> BackendResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>>;
    async fn set_verification_token(&self, id: Uuid, token_hash: &str) -> BackendResult<()>;
    /// Confirm the account holding this token and clear the token
    async fn confirm_user_by_token(&self, token_hash: &str) -> BackendResult<Option<User>>;

    // Events
    /// Insert the event and its venue links atomically
    async fn create_event(&self, owner: Uuid, input: &EventInput) -> BackendResult<EventWithVenues>;
    /// Replace an owned event's fields and venue links. `None` when no row
    /// owned by `owner` has this id.
    async fn update_event(
        &self,
        owner: Uuid,
        id: Uuid,
        input: &EventInput,
    ) -> BackendResult<Option<EventWithVenues>>;
    async fn delete_event(&self, owner: Uuid, id: Uuid) -> BackendResult<bool>;
    async fn get_event(&self, id: Uuid) -> BackendResult<Option<EventWithVenues>>;
    async fn find_event_row(&self, id: Uuid) -> BackendResult<Option<Event>>;
    async fn list_events(&self, filter: &EventFilter) -> BackendResult<Vec<EventWithVenues>>;
    async fn list_user_events(&self, owner: Uuid) -> BackendResult<Vec<EventWithVenues>>;

    // Venues
    async fn create_venue(&self, input: &VenueInput) -> BackendResult<Venue>;
    async fn get_venue(&self, id: Uuid) -> BackendResult<Option<Venue>>;
    async fn list_venues(&self) -> BackendResult<Vec<Venue>>;
    async fn search_venues(&self, query: &str, limit: i64) -> BackendResult<Vec<Venue>>;
}
