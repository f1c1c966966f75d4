// handlers/mod.rs - HTTP handlers, one module per resource
//
// Handlers stay thin: extract, call the action, wrap the ActionResult.
// Authorization lives in the actions, never here.
pub mod auth;
pub mod events;
pub mod system;
pub mod venues;
