use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;
use crate::{api, assets};

/// Build the main application router with all routes.
///
/// Anything not matched here is looked up in the static assets directory,
/// including other methods on `/`.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/",
            get(assets::landing_page).fallback(assets::static_fallback),
        )
        .route("/messages", get(api::list_messages).post(api::create_message))
        .fallback(assets::static_fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
