/// API routes and handlers
pub mod app;
pub mod middleware;
pub mod pos;
pub mod resources;
pub mod web;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    Router::new()
        .merge(web::routes())
        .merge(resources::routes())
        .merge(app::routes(ctx))
        .merge(pos::routes())
}
