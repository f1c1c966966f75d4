use tracing::debug;
use uuid::Uuid;

use super::{run_action, run_authenticated_action, validate, ActionContext, ActionError, ActionResult};
use crate::database::models::{Venue, VenueInput};

pub async fn create_venue(ctx: &ActionContext, input: VenueInput) -> ActionResult<Venue> {
    run_authenticated_action(ctx, move |client, identity| async move {
        validate(&input)?;
        let venue = client.create_venue(&input).await?;
        debug!(venue_id = %venue.id, user_id = %identity.user_id, "Created venue");
        Ok(venue)
    })
    .await
}

pub async fn get_venues(ctx: &ActionContext) -> ActionResult<Vec<Venue>> {
    run_action(ctx, false, |client, _| async move { Ok(client.list_venues().await?) }).await
}

pub async fn get_venue(ctx: &ActionContext, id: Uuid) -> ActionResult<Venue> {
    run_action(ctx, false, move |client, _| async move {
        client
            .get_venue(id)
            .await?
            .ok_or_else(|| ActionError::not_found("Venue not found"))
    })
    .await
}

/// Substring search over name, city and address, at most `limit` rows
pub async fn search_venues(ctx: &ActionContext, query: &str, limit: i64) -> ActionResult<Vec<Venue>> {
    let query = query.trim().to_string();
    run_action(ctx, false, move |client, _| async move {
        if query.is_empty() {
            return Ok(vec![]);
        }
        Ok(client.search_venues(&query, limit.max(0)).await?)
    })
    .await
}
