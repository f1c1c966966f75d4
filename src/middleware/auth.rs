use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

use crate::actions::ActionContext;
use crate::app::AppState;
use crate::auth::SessionResolver;

/// Name of the cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "session";

/// Every handler gets an [`ActionContext`] bound to the request's session.
///
/// Never rejects: a missing or unusable token just means an anonymous caller,
/// and the action decides whether that is acceptable.
#[async_trait]
impl FromRequestParts<AppState> for ActionContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers);
        let resolver = SessionResolver::new(token, Arc::clone(&state.auth));
        Ok(ActionContext::new(state.backend.clone(), Arc::new(resolver)).with_timeout(state.action_timeout))
    }
}

/// Bearer token first, then the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_jwt_from_headers(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.trim().is_empty())
    })
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;

    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        tracing::debug!("Empty bearer token");
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer abc"),
            (header::COOKIE, "session=def"),
        ]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let map = headers(&[(header::COOKIE, "theme=dark; session=def")]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("def"));
    }

    #[test]
    fn ignores_other_schemes_and_blanks() {
        let map = headers(&[(header::AUTHORIZATION, "Basic Zm9vOmJhcg==")]);
        assert_eq!(extract_session_token(&map), None);
        let map = headers(&[(header::AUTHORIZATION, "Bearer   ")]);
        assert_eq!(extract_session_token(&map), None);
    }
}
