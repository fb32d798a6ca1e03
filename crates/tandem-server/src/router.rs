use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tandem_protocol::endpoints;
use tower_http::trace::TraceLayer;

use crate::context::GatewayContext;
use crate::handler;

/// Build the axum router with all gateway endpoints.
pub fn build_router(ctx: Arc<GatewayContext>) -> Router {
    let upload_limit = DefaultBodyLimit::max(ctx.max_upload_bytes());
    Router::new()
        .route(endpoints::ROOT, get(handler::root))
        .route(endpoints::HEALTH, get(handler::health))
        .route(endpoints::CREATE_NODES, get(handler::create_nodes))
        .route(endpoints::MAP_NODES, get(handler::map_nodes))
        .route(endpoints::NODES, get(handler::nodes))
        .route(endpoints::CONTENT, post(handler::add_content))
        .route(endpoints::CONTENT_BY_CID, get(handler::get_content))
        .route(endpoints::FILE_BY_CID, get(handler::get_content))
        .route(endpoints::LS_BY_CID, get(handler::ls))
        .route(endpoints::UPLOAD, post(handler::upload).layer(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
