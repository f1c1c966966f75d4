//! Action result wrapper.
//!
//! Every backend-facing operation runs through [`run_action`] or
//! [`run_authenticated_action`]. The wrapper resolves the caller, gates on
//! identity when asked to, runs the operation with a fresh backend handle and
//! folds every outcome (including panics and timeouts) into an
//! [`ActionResult`]. Callers never see an error escape.

pub mod auth;
pub mod events;
pub mod venues;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::ser::{Error as _, Serialize, SerializeStruct, Serializer};
use thiserror::Error;
use tracing::{debug, error, warn};
use validator::{Validate, ValidationErrors};

use crate::auth::{AnonymousSession, AuthError, CallerIdentity, IdentityResolver};
use crate::database::{ArcBackend, BackendError};

pub const UNAUTHORIZED_MESSAGE: &str = "You must be logged in to perform this action";
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Machine-readable failure codes
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_REFERENCE: &str = "INVALID_REFERENCE";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const UNVERIFIED_EMAIL: &str = "unverified_email";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const ALREADY_VERIFIED: &str = "already_verified";
}

/// Failure half of an [`ActionResult`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub message: String,
    /// Not part of the serialized shape; the HTTP layer maps it to a status
    pub code: Option<String>,
}

/// Uniform outcome of an action: `{ data, error: null }` or `{ data: null, error }`.
///
/// Exactly one side is ever null. A success whose payload itself serializes to
/// null (`()`, `None`) has nothing to report, so it goes out as a failure with
/// [`GENERIC_ERROR_MESSAGE`]; operations should return a real payload instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
    Success(T),
    Failure(ActionFailure),
}

impl<T> ActionResult<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            ActionResult::Success(data) => Some(data),
            ActionResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure(failure) => Some(&failure.message),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ActionResult::Success(_) => None,
            ActionResult::Failure(failure) => failure.code.as_deref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, ActionFailure> {
        match self {
            ActionResult::Success(data) => Ok(data),
            ActionResult::Failure(failure) => Err(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        match self {
            ActionResult::Success(data) => ActionResult::Success(f(data)),
            ActionResult::Failure(failure) => ActionResult::Failure(failure),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ActionResult", 2)?;
        match self {
            ActionResult::Success(data) => {
                let data = serde_json::to_value(data).map_err(S::Error::custom)?;
                if data.is_null() {
                    warn!("Action succeeded with a null payload");
                    state.serialize_field("data", &data)?;
                    state.serialize_field("error", GENERIC_ERROR_MESSAGE)?;
                } else {
                    state.serialize_field("data", &data)?;
                    state.serialize_field("error", &None::<&str>)?;
                }
            }
            ActionResult::Failure(failure) => {
                state.serialize_field("data", &None::<()>)?;
                state.serialize_field("error", &failure.message)?;
            }
        }
        state.end()
    }
}

/// Errors an operation can fail with inside the wrapper
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("You must be logged in to perform this action")]
    Unauthorized,

    /// Expected domain failure; the message is shown to the caller verbatim
    #[error("{message}")]
    Application { message: String, code: Option<String> },

    #[error("The action did not complete within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        ActionError::Application {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: &str) -> Self {
        ActionError::Application {
            message: message.into(),
            code: Some(code.to_string()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(message, codes::NOT_FOUND)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_code(message, codes::FORBIDDEN)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_code(message, codes::CONFLICT)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code(message, codes::VALIDATION_ERROR)
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        ActionError::Unexpected(anyhow::anyhow!(message))
    }

    /// Fold into the caller-facing failure, logging unexpected faults
    fn into_failure(self) -> ActionFailure {
        match self {
            ActionError::Unauthorized => {
                debug!("Action rejected: no verified caller");
                ActionFailure {
                    message: UNAUTHORIZED_MESSAGE.to_string(),
                    code: Some(codes::UNAUTHORIZED.to_string()),
                }
            }
            ActionError::Application { message, code } => {
                debug!(code = code.as_deref(), "Action failed: {}", message);
                ActionFailure { message, code }
            }
            ActionError::Timeout(limit) => {
                warn!(timeout = ?limit, "Action timed out");
                ActionFailure {
                    message: ActionError::Timeout(limit).to_string(),
                    code: Some(codes::TIMEOUT.to_string()),
                }
            }
            ActionError::Unexpected(err) => {
                log_unexpected(&err);
                let message = err.to_string();
                let message = if message.trim().is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                ActionFailure {
                    message,
                    code: None,
                }
            }
        }
    }
}

impl From<BackendError> for ActionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(msg) => ActionError::not_found(msg),
            BackendError::Conflict(_) => {
                ActionError::conflict("A record with these values already exists")
            }
            BackendError::InvalidReference(_) => ActionError::with_code(
                "One or more referenced records do not exist",
                codes::INVALID_REFERENCE,
            ),
            other => ActionError::Unexpected(other.into()),
        }
    }
}

impl From<AuthError> for ActionError {
    fn from(err: AuthError) -> Self {
        ActionError::Unexpected(err.into())
    }
}

impl From<ValidationErrors> for ActionError {
    fn from(errors: ValidationErrors) -> Self {
        ActionError::validation(validation_message(&errors))
    }
}

/// Run the derived validators on an input, as an application error
pub fn validate<T: Validate>(input: &T) -> Result<(), ActionError> {
    input.validate().map_err(ActionError::from)
}

/// Field messages sorted by field name and joined into one line
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut entries: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.clone(), message)
            })
        })
        .collect();
    entries.sort();
    entries.dedup();

    if entries.is_empty() {
        return "Invalid input".to_string();
    }
    entries
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Diagnostic fields pulled out of a database fault, when there is one
#[derive(Debug, Default)]
struct Diagnostics {
    code: Option<String>,
    hint: Option<String>,
    detail: Option<String>,
}

impl Diagnostics {
    fn from_error(err: &anyhow::Error) -> Self {
        let mut diagnostics = Diagnostics::default();
        for cause in err.chain() {
            let sqlx_err = match cause.downcast_ref::<BackendError>() {
                Some(BackendError::Sqlx(inner)) => Some(inner),
                _ => cause.downcast_ref::<sqlx::Error>(),
            };
            if let Some(sqlx::Error::Database(db)) = sqlx_err {
                diagnostics.code = db.code().map(|c| c.to_string());
                if let Some(pg) = db.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
                    diagnostics.hint = pg.hint().map(str::to_string);
                    diagnostics.detail = pg.detail().map(str::to_string);
                }
                break;
            }
        }
        diagnostics
    }
}

fn log_unexpected(err: &anyhow::Error) {
    let diagnostics = Diagnostics::from_error(err);
    error!(
        error = %err,
        chain = ?err,
        code = diagnostics.code.as_deref(),
        hint = diagnostics.hint.as_deref(),
        detail = diagnostics.detail.as_deref(),
        backtrace = %err.backtrace(),
        "Action error"
    );
}

/// Explicit per-call context: backend handle source, session and limits
#[derive(Clone)]
pub struct ActionContext {
    backend: ArcBackend,
    resolver: Arc<dyn IdentityResolver>,
    timeout: Option<Duration>,
}

impl ActionContext {
    pub fn new(backend: ArcBackend, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            backend,
            resolver,
            timeout: None,
        }
    }

    /// Context with no session at all
    pub fn anonymous(backend: ArcBackend) -> Self {
        Self::new(backend, Arc::new(AnonymousSession))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// A fresh client handle for one invocation
    fn client(&self) -> ArcBackend {
        Arc::clone(&self.backend)
    }
}

/// Run `operation`, optionally requiring a verified caller, and fold every
/// outcome into an [`ActionResult`].
///
/// When `require_identity` is set and no caller resolves, `operation` is
/// never invoked.
pub async fn run_action<T, F, Fut>(
    ctx: &ActionContext,
    require_identity: bool,
    operation: F,
) -> ActionResult<T>
where
    F: FnOnce(ArcBackend, Option<CallerIdentity>) -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    let client = ctx.client();
    let resolver = Arc::clone(&ctx.resolver);

    let work = async move {
        let identity = resolver.resolve(&client).await?;
        if require_identity && identity.is_none() {
            return Err(ActionError::Unauthorized);
        }
        operation(client, identity).await
    };
    let guarded = AssertUnwindSafe(work).catch_unwind();

    let outcome = match ctx.timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(Err(ActionError::Timeout(limit))),
        },
        None => guarded.await,
    };

    match outcome.unwrap_or_else(|panic| Err(ActionError::from_panic(panic))) {
        Ok(data) => ActionResult::Success(data),
        Err(err) => ActionResult::Failure(err.into_failure()),
    }
}

/// [`run_action`] with identity required; the operation receives the
/// resolved caller directly.
pub async fn run_authenticated_action<T, F, Fut>(ctx: &ActionContext, operation: F) -> ActionResult<T>
where
    F: FnOnce(ArcBackend, CallerIdentity) -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    run_action(ctx, true, move |client, identity| async move {
        let identity = identity.ok_or(ActionError::Unauthorized)?;
        operation(client, identity).await
    })
    .await
}
