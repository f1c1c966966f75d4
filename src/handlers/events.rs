// handlers/events.rs - /api/events

use uuid::Uuid;

use crate::actions::events::{self, EventRef};
use crate::actions::ActionContext;
use crate::database::models::{EventInput, EventWithVenues};
use crate::filter::EventFilter;
use crate::middleware::{ActionJson, ActionPath, ActionQuery, ActionResponse};

/// GET /api/events?search=&sport_type=
pub async fn list(ctx: ActionContext, ActionQuery(filter): ActionQuery<EventFilter>) -> ActionResponse<Vec<EventWithVenues>> {
    ActionResponse::ok(events::get_events(&ctx, filter).await)
}

pub async fn create(ctx: ActionContext, ActionJson(input): ActionJson<EventInput>) -> ActionResponse<EventWithVenues> {
    ActionResponse::created(events::create_event(&ctx, input).await)
}

/// GET /api/events/mine
pub async fn mine(ctx: ActionContext) -> ActionResponse<Vec<EventWithVenues>> {
    ActionResponse::ok(events::get_user_events(&ctx).await)
}

pub async fn show(ctx: ActionContext, ActionPath(id): ActionPath<Uuid>) -> ActionResponse<EventWithVenues> {
    ActionResponse::ok(events::get_event(&ctx, id).await)
}

pub async fn update(
    ctx: ActionContext,
    ActionPath(id): ActionPath<Uuid>,
    ActionJson(input): ActionJson<EventInput>,
) -> ActionResponse<EventRef> {
    ActionResponse::ok(events::update_event(&ctx, id, input).await)
}

pub async fn remove(ctx: ActionContext, ActionPath(id): ActionPath<Uuid>) -> ActionResponse<EventRef> {
    ActionResponse::ok(events::delete_event(&ctx, id).await)
}
