// handlers/auth.rs - /auth/*
//
// Same actions as everywhere else; the only HTTP-specific part is keeping
// the session cookie in step with the outcome.

use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::actions::auth::{self, Notice, SignInInput, SignUpInput, SignUpOutcome};
use crate::actions::{ActionContext, ActionResult};
use crate::app::AppState;
use crate::auth::Session;
use crate::database::models::UserProfile;
use crate::middleware::{ActionJson, ActionResponse, SESSION_COOKIE};

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendBody {
    pub email: String,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .build()
}

fn remember(jar: CookieJar, session: Option<&Session>, secure: bool) -> CookieJar {
    match session {
        Some(session) => jar.add(session_cookie(session.token.clone(), secure)),
        None => jar,
    }
}

/// POST /auth/sign-up - signs the user in right away unless confirmation is required
pub async fn sign_up(
    State(state): State<AppState>,
    ctx: ActionContext,
    jar: CookieJar,
    ActionJson(input): ActionJson<SignUpInput>,
) -> (CookieJar, ActionResponse<SignUpOutcome>) {
    let result = auth::sign_up(&ctx, &state.auth, input).await;
    let session = match &result {
        ActionResult::Success(SignUpOutcome::SignedIn(session)) => Some(session),
        _ => None,
    };
    let jar = remember(jar, session, state.cookie_secure);
    (jar, ActionResponse::created(result))
}

pub async fn sign_in(
    State(state): State<AppState>,
    ctx: ActionContext,
    jar: CookieJar,
    ActionJson(input): ActionJson<SignInInput>,
) -> (CookieJar, ActionResponse<Session>) {
    let result = auth::sign_in(&ctx, &state.auth, input).await;
    let jar = remember(jar, result.data(), state.cookie_secure);
    (jar, ActionResponse::ok(result))
}

pub async fn sign_out(ctx: ActionContext, jar: CookieJar) -> (CookieJar, ActionResponse<Notice>) {
    let result = auth::sign_out(&ctx).await;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, ActionResponse::ok(result))
}

pub async fn me(ctx: ActionContext) -> ActionResponse<UserProfile> {
    ActionResponse::ok(auth::current_user(&ctx).await)
}

pub async fn verify(ctx: ActionContext, ActionJson(body): ActionJson<VerifyBody>) -> ActionResponse<UserProfile> {
    ActionResponse::ok(auth::verify_email(&ctx, &body.token).await)
}

pub async fn resend_verification(
    State(state): State<AppState>,
    ctx: ActionContext,
    ActionJson(body): ActionJson<ResendBody>,
) -> ActionResponse<Notice> {
    ActionResponse::ok(auth::resend_verification(&ctx, &state.auth, &body.email).await)
}
