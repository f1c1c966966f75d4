pub mod event;
pub mod user;
pub mod venue;

pub use event::{Event, EventInput, EventWithVenues};
pub use user::{NewUser, User, UserProfile};
pub use venue::{Venue, VenueInput};
