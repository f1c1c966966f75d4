use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::venue::Venue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sport_type: String,
    pub event_date: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event together with every venue linked to it through `event_venues`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWithVenues {
    #[serde(flatten)]
    pub event: Event,
    pub venues: Vec<Venue>,
}

/// Fields accepted when creating or replacing an event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventInput {
    #[validate(length(min = 1, max = 255, message = "Event name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Sport type is required"))]
    pub sport_type: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "At least one venue is required"))]
    pub venue_ids: Vec<Uuid>,
}

impl EventInput {
    /// Venue ids with duplicates removed, first occurrence wins
    pub fn unique_venue_ids(&self) -> Vec<Uuid> {
        let mut seen = Vec::with_capacity(self.venue_ids.len());
        for id in &self.venue_ids {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}
