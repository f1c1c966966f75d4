//! Request extractors whose rejections use the action envelope.

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};

use crate::error::ApiError;

/// `Json<T>` that answers malformed bodies with `{ data: null, error }`
pub struct ActionJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ActionJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ActionJson(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::invalid_json(format!("Invalid request body: {}", rejection.body_text())))
            }
        }
    }
}

pub struct ActionPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ActionPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ActionPath(value))
            .map_err(|rejection| ApiError::bad_request(format!("Invalid path: {}", rejection.body_text())))
    }
}

pub struct ActionQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ActionQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ActionQuery(value))
            .map_err(|rejection| ApiError::bad_request(format!("Invalid query: {}", rejection.body_text())))
    }
}
