use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{run_action, run_authenticated_action, validate, ActionContext, ActionError, ActionResult};
use crate::database::models::{EventInput, EventWithVenues};
use crate::database::ArcBackend;
use crate::filter::EventFilter;

/// Identifier returned by mutations that do not echo the row back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: Uuid,
}

pub async fn create_event(ctx: &ActionContext, input: EventInput) -> ActionResult<EventWithVenues> {
    run_authenticated_action(ctx, move |client, identity| async move {
        validate(&input)?;
        let event = client.create_event(identity.user_id, &input).await?;
        debug!(event_id = %event.event.id, user_id = %identity.user_id, "Created event");
        Ok(event)
    })
    .await
}

pub async fn update_event(ctx: &ActionContext, id: Uuid, input: EventInput) -> ActionResult<EventRef> {
    run_authenticated_action(ctx, move |client, identity| async move {
        validate(&input)?;
        match client.update_event(identity.user_id, id, &input).await? {
            Some(_) => Ok(EventRef { id }),
            None => Err(missing_or_foreign(&client, id).await?),
        }
    })
    .await
}

pub async fn delete_event(ctx: &ActionContext, id: Uuid) -> ActionResult<EventRef> {
    run_authenticated_action(ctx, move |client, identity| async move {
        if client.delete_event(identity.user_id, id).await? {
            debug!(event_id = %id, user_id = %identity.user_id, "Deleted event");
            Ok(EventRef { id })
        } else {
            Err(missing_or_foreign(&client, id).await?)
        }
    })
    .await
}

/// Public listing, filtered by name substring and sport type
pub async fn get_events(ctx: &ActionContext, filter: EventFilter) -> ActionResult<Vec<EventWithVenues>> {
    let filter = filter.normalized();
    run_action(ctx, false, move |client, _| async move {
        Ok(client.list_events(&filter).await?)
    })
    .await
}

pub async fn get_event(ctx: &ActionContext, id: Uuid) -> ActionResult<EventWithVenues> {
    run_action(ctx, false, move |client, _| async move {
        client
            .get_event(id)
            .await?
            .ok_or_else(|| ActionError::not_found("Event not found"))
    })
    .await
}

/// Events owned by the caller
pub async fn get_user_events(ctx: &ActionContext) -> ActionResult<Vec<EventWithVenues>> {
    run_authenticated_action(ctx, |client, identity| async move {
        Ok(client.list_user_events(identity.user_id).await?)
    })
    .await
}

/// An owner-scoped mutation touched nothing: tell apart "no such event" from
/// "someone else's event"
async fn missing_or_foreign(client: &ArcBackend, id: Uuid) -> Result<ActionError, ActionError> {
    Ok(match client.find_event_row(id).await? {
        Some(_) => ActionError::forbidden("You can only modify your own events"),
        None => ActionError::not_found("Event not found"),
    })
}
