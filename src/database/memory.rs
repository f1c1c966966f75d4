use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Event, EventInput, EventWithVenues, NewUser, User, Venue, VenueInput};
use super::{Backend, BackendError, BackendResult};
use crate::filter::{contains_ignore_case, EventFilter};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    venues: HashMap<Uuid, Venue>,
    /// (event_id, venue_id) rows of the join table
    event_venues: Vec<(Uuid, Uuid)>,
}

impl Store {
    fn with_venues(&self, event: &Event) -> EventWithVenues {
        let mut venues: Vec<Venue> = self
            .event_venues
            .iter()
            .filter(|(event_id, _)| *event_id == event.id)
            .filter_map(|(_, venue_id)| self.venues.get(venue_id).cloned())
            .collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        EventWithVenues {
            event: event.clone(),
            venues,
        }
    }

    fn sorted_events<'a>(&self, events: impl Iterator<Item = &'a Event>) -> Vec<EventWithVenues> {
        let mut events: Vec<&Event> = events.collect();
        events.sort_by(|a, b| {
            a.event_date
                .cmp(&b.event_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        events.into_iter().map(|e| self.with_venues(e)).collect()
    }

    fn check_venues(&self, venue_ids: &[Uuid]) -> BackendResult<()> {
        match venue_ids.iter().find(|id| !self.venues.contains_key(id)) {
            Some(missing) => Err(BackendError::InvalidReference(format!(
                "venue {missing} does not exist"
            ))),
            None => Ok(()),
        }
    }

    fn link(&mut self, event_id: Uuid, venue_ids: &[Uuid]) {
        self.event_venues.retain(|(e, _)| *e != event_id);
        self.event_venues
            .extend(venue_ids.iter().map(|venue_id| (event_id, *venue_id)));
    }
}

/// In-process `Backend` used by tests and the development server.
///
/// Mirrors the relational constraints of the Postgres schema: unique emails,
/// venue references checked on link, cascade of links on event delete.
#[derive(Default)]
pub struct MemoryBackend {
    store: RwLock<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn health_check(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> BackendResult<User> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(BackendError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }

        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            email_confirmed_at: user.confirmed.then_some(now),
            verification_token_hash: user.verification_token_hash,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_user(&self, id: Uuid) -> BackendResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> BackendResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn set_verification_token(&self, id: Uuid, token_hash: &str) -> BackendResult<()> {
        let mut store = self.store.write().await;
        let user = store
            .users
            .get_mut(&id)
            .ok_or_else(|| BackendError::NotFound(format!("user {id}")))?;
        user.verification_token_hash = Some(token_hash.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn confirm_user_by_token(&self, token_hash: &str) -> BackendResult<Option<User>> {
        let mut store = self.store.write().await;
        let Some(user) = store
            .users
            .values_mut()
            .find(|u| u.verification_token_hash.as_deref() == Some(token_hash))
        else {
            return Ok(None);
        };

        let now = Utc::now();
        user.email_confirmed_at.get_or_insert(now);
        user.verification_token_hash = None;
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn create_event(&self, owner: Uuid, input: &EventInput) -> BackendResult<EventWithVenues> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&owner) {
            return Err(BackendError::InvalidReference(format!("user {owner} does not exist")));
        }
        let venue_ids = input.unique_venue_ids();
        store.check_venues(&venue_ids)?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            user_id: owner,
            name: input.name.clone(),
            sport_type: input.sport_type.clone(),
            event_date: input.event_date,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        store.events.insert(event.id, event.clone());
        store.link(event.id, &venue_ids);
        Ok(store.with_venues(&event))
    }

    async fn update_event(
        &self,
        owner: Uuid,
        id: Uuid,
        input: &EventInput,
    ) -> BackendResult<Option<EventWithVenues>> {
        let mut store = self.store.write().await;
        let owned = store.events.get(&id).is_some_and(|e| e.user_id == owner);
        if !owned {
            return Ok(None);
        }
        let venue_ids = input.unique_venue_ids();
        store.check_venues(&venue_ids)?;

        let Some(event) = store.events.get_mut(&id) else {
            return Ok(None);
        };
        event.name = input.name.clone();
        event.sport_type = input.sport_type.clone();
        event.event_date = input.event_date;
        event.description = input.description.clone();
        event.updated_at = Utc::now();
        let event = event.clone();

        store.link(id, &venue_ids);
        Ok(Some(store.with_venues(&event)))
    }

    async fn delete_event(&self, owner: Uuid, id: Uuid) -> BackendResult<bool> {
        let mut store = self.store.write().await;
        let owned = store.events.get(&id).is_some_and(|e| e.user_id == owner);
        if !owned {
            return Ok(false);
        }
        store.events.remove(&id);
        store.event_venues.retain(|(event_id, _)| *event_id != id);
        Ok(true)
    }

    async fn get_event(&self, id: Uuid) -> BackendResult<Option<EventWithVenues>> {
        let store = self.store.read().await;
        Ok(store.events.get(&id).map(|e| store.with_venues(e)))
    }

    async fn find_event_row(&self, id: Uuid) -> BackendResult<Option<Event>> {
        Ok(self.store.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> BackendResult<Vec<EventWithVenues>> {
        let store = self.store.read().await;
        Ok(store.sorted_events(
            store
                .events
                .values()
                .filter(|e| filter.matches(&e.name, &e.sport_type)),
        ))
    }

    async fn list_user_events(&self, owner: Uuid) -> BackendResult<Vec<EventWithVenues>> {
        let store = self.store.read().await;
        Ok(store.sorted_events(store.events.values().filter(|e| e.user_id == owner)))
    }

    async fn create_venue(&self, input: &VenueInput) -> BackendResult<Venue> {
        let now = Utc::now();
        let venue = Venue {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            country: input.country.clone(),
            postal_code: input.postal_code.clone(),
            created_at: now,
            updated_at: now,
        };
        self.store.write().await.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn get_venue(&self, id: Uuid) -> BackendResult<Option<Venue>> {
        Ok(self.store.read().await.venues.get(&id).cloned())
    }

    async fn list_venues(&self) -> BackendResult<Vec<Venue>> {
        let store = self.store.read().await;
        let mut venues: Vec<Venue> = store.venues.values().cloned().collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn search_venues(&self, query: &str, limit: i64) -> BackendResult<Vec<Venue>> {
        let store = self.store.read().await;
        let mut venues: Vec<Venue> = store
            .venues
            .values()
            .filter(|v| {
                contains_ignore_case(&v.name, query)
                    || contains_ignore_case(&v.city, query)
                    || contains_ignore_case(&v.address, query)
            })
            .cloned()
            .collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        venues.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(venues)
    }
}
