use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::models::{Event, EventInput, EventWithVenues, NewUser, User, Venue, VenueInput};
use super::{Backend, BackendError, BackendResult};
use crate::filter::{like_pattern, EventFilter};

const EVENT_COLUMNS: &str =
    "id, user_id, name, sport_type, event_date, description, created_at, updated_at";
const VENUE_COLUMNS: &str =
    "id, name, address, city, state, country, postal_code, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, email, password_hash, email_confirmed_at, verification_token_hash, created_at, updated_at";

/// Postgres SQLSTATE codes mapped onto `BackendError`
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(FromRow)]
struct LinkedVenueRow {
    event_id: Uuid,
    #[sqlx(flatten)]
    venue: Venue,
}

/// `Backend` over a Postgres pool
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load linked venues for a batch of events with one query
    async fn attach_venues(&self, events: Vec<Event>) -> BackendResult<Vec<EventWithVenues>> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let sql = format!(
            "SELECT ev.event_id, {} FROM event_venues ev \
             JOIN venues v ON v.id = ev.venue_id \
             WHERE ev.event_id = ANY($1) ORDER BY v.name ASC",
            prefixed(VENUE_COLUMNS, "v")
        );
        let rows: Vec<LinkedVenueRow> = sqlx::query_as(&sql)
            .bind(ids.as_slice())
            .fetch_all(&self.pool)
            .await?;

        let mut by_event: HashMap<Uuid, Vec<Venue>> = HashMap::new();
        for row in rows {
            by_event.entry(row.event_id).or_default().push(row.venue);
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let venues = by_event.remove(&event.id).unwrap_or_default();
                EventWithVenues { event, venues }
            })
            .collect())
    }

    async fn attach_one(&self, event: Event) -> BackendResult<EventWithVenues> {
        let mut loaded = self.attach_venues(vec![event]).await?;
        loaded
            .pop()
            .ok_or_else(|| BackendError::NotFound("event vanished while loading venues".to_string()))
    }

    async fn insert_links(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        venue_ids: &[Uuid],
    ) -> BackendResult<()> {
        sqlx::query("INSERT INTO event_venues (event_id, venue_id) SELECT $1, UNNEST($2::uuid[])")
            .bind(event_id)
            .bind(venue_ids)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

/// Map constraint violations onto domain errors; everything else stays a
/// database fault
fn classify(err: sqlx::Error) -> BackendError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return BackendError::Conflict(db.message().to_string()),
            Some(FOREIGN_KEY_VIOLATION) => {
                return BackendError::InvalidReference(db.message().to_string())
            }
            _ => {}
        }
    }
    BackendError::Sqlx(err)
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Backend for PgBackend {
    async fn health_check(&self) -> BackendResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> BackendResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, email_confirmed_at, verification_token_hash) \
             VALUES ($1, $2, CASE WHEN $3 THEN now() ELSE NULL END, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.confirmed)
            .bind(&user.verification_token_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn find_user(&self, id: Uuid) -> BackendResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn set_verification_token(&self, id: Uuid, token_hash: &str) -> BackendResult<()> {
        let result = sqlx::query(
            "UPDATE users SET verification_token_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn confirm_user_by_token(&self, token_hash: &str) -> BackendResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET email_confirmed_at = COALESCE(email_confirmed_at, now()), \
             verification_token_hash = NULL, updated_at = now() \
             WHERE verification_token_hash = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_event(&self, owner: Uuid, input: &EventInput) -> BackendResult<EventWithVenues> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO events (user_id, name, sport_type, event_date, description) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EVENT_COLUMNS}"
        );
        let event: Event = sqlx::query_as(&sql)
            .bind(owner)
            .bind(&input.name)
            .bind(&input.sport_type)
            .bind(input.event_date)
            .bind(&input.description)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        Self::insert_links(&mut tx, event.id, &input.unique_venue_ids()).await?;
        tx.commit().await?;

        self.attach_one(event).await
    }

    async fn update_event(
        &self,
        owner: Uuid,
        id: Uuid,
        input: &EventInput,
    ) -> BackendResult<Option<EventWithVenues>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE events SET name = $3, sport_type = $4, event_date = $5, description = $6, \
             updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {EVENT_COLUMNS}"
        );
        let updated: Option<Event> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner)
            .bind(&input.name)
            .bind(&input.sport_type)
            .bind(input.event_date)
            .bind(&input.description)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(event) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM event_venues WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_links(&mut tx, id, &input.unique_venue_ids()).await?;
        tx.commit().await?;

        self.attach_one(event).await.map(Some)
    }

    async fn delete_event(&self, owner: Uuid, id: Uuid) -> BackendResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_event(&self, id: Uuid) -> BackendResult<Option<EventWithVenues>> {
        match self.find_event_row(id).await? {
            Some(event) => self.attach_one(event).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_event_row(&self, id: Uuid) -> BackendResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_events(&self, filter: &EventFilter) -> BackendResult<Vec<EventWithVenues>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

        if let Some(search) = &filter.search {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(search));
        }
        if let Some(sport_type) = &filter.sport_type {
            qb.push(" AND sport_type = ").push_bind(sport_type.clone());
        }
        qb.push(" ORDER BY event_date ASC, created_at ASC");

        let events: Vec<Event> = qb.build_query_as().fetch_all(&self.pool).await?;
        self.attach_venues(events).await
    }

    async fn list_user_events(&self, owner: Uuid) -> BackendResult<Vec<EventWithVenues>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = $1 \
             ORDER BY event_date ASC, created_at ASC"
        );
        let events: Vec<Event> = sqlx::query_as(&sql).bind(owner).fetch_all(&self.pool).await?;
        self.attach_venues(events).await
    }

    async fn create_venue(&self, input: &VenueInput) -> BackendResult<Venue> {
        let sql = format!(
            "INSERT INTO venues (name, address, city, state, country, postal_code) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {VENUE_COLUMNS}"
        );
        sqlx::query_as(&sql)
            .bind(&input.name)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.country)
            .bind(&input.postal_code)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_venue(&self, id: Uuid) -> BackendResult<Option<Venue>> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1");
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_venues(&self) -> BackendResult<Vec<Venue>> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues ORDER BY name ASC");
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn search_venues(&self, query: &str, limit: i64) -> BackendResult<Vec<Venue>> {
        let sql = format!(
            "SELECT {VENUE_COLUMNS} FROM venues \
             WHERE name ILIKE $1 OR city ILIKE $1 OR address ILIKE $1 \
             ORDER BY name ASC LIMIT $2"
        );
        Ok(sqlx::query_as(&sql)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}
