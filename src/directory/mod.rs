/// Directory component
///
/// Owns Event, User, and Interest storage. Pure lookup and persistence;
/// membership and moderation rules live in their own components.
pub mod events;
pub mod models;
pub mod users;

pub use events::EventDirectory;
pub use models::{Event, EventDraft, EventFilter, Interest, Role, User};
pub use users::UserDirectory;
