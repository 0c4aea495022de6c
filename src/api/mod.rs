/// API routes and handlers
pub mod events;
pub mod reports;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(events::routes())
        .merge(reports::routes())
        .merge(users::routes())
}
