// handlers/venues.rs - /api/venues

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::actions::venues;
use crate::actions::ActionContext;
use crate::app::AppState;
use crate::database::models::{Venue, VenueInput};
use crate::middleware::{ActionJson, ActionPath, ActionQuery, ActionResponse};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn list(ctx: ActionContext) -> ActionResponse<Vec<Venue>> {
    ActionResponse::ok(venues::get_venues(&ctx).await)
}

pub async fn create(ctx: ActionContext, ActionJson(input): ActionJson<VenueInput>) -> ActionResponse<Venue> {
    ActionResponse::created(venues::create_venue(&ctx, input).await)
}

/// GET /api/venues/search?q=
pub async fn search(
    State(state): State<AppState>,
    ctx: ActionContext,
    ActionQuery(params): ActionQuery<SearchParams>,
) -> ActionResponse<Vec<Venue>> {
    ActionResponse::ok(venues::search_venues(&ctx, &params.q, state.venue_search_limit).await)
}

pub async fn show(ctx: ActionContext, ActionPath(id): ActionPath<Uuid>) -> ActionResponse<Venue> {
    ActionResponse::ok(venues::get_venue(&ctx, id).await)
}
