pub mod auth;
pub mod extract;
pub mod response;

pub use auth::{extract_session_token, SESSION_COOKIE};
pub use extract::{ActionJson, ActionPath, ActionQuery};
pub use response::ActionResponse;
