use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::actions::ActionResult;
use crate::error::status_for_code;

/// An [`ActionResult`] on its way out, with the status to use on success
#[derive(Debug)]
pub struct ActionResponse<T: Serialize> {
    pub result: ActionResult<T>,
    pub success_status: StatusCode,
}

impl<T: Serialize> ActionResponse<T> {
    /// 200 on success
    pub fn ok(result: ActionResult<T>) -> Self {
        Self {
            result,
            success_status: StatusCode::OK,
        }
    }

    /// 201 on success
    pub fn created(result: ActionResult<T>) -> Self {
        Self {
            result,
            success_status: StatusCode::CREATED,
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.result {
            ActionResult::Success(_) => self.success_status,
            ActionResult::Failure(failure) => status_for_code(failure.code.as_deref()),
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status();

        // Serialize eagerly so a broken payload still yields the envelope
        match serde_json::to_value(&self.result) {
            // A null success payload is reported as a failure by the envelope
            Ok(body) if status.is_success() && !body["error"].is_null() => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "data": null,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        ActionResponse::ok(self).into_response()
    }
}
