pub mod error;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use axum::{Router, http::HeaderValue};
use db::DBService;
use services::services::config::Config;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub config: Arc<Config>,
}

/// Assemble the full application router.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let cors = match &state.config.client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let api = Router::new()
        .merge(routes::health::router())
        .merge(routes::organizations::router())
        .merge(routes::students::router())
        .merge(routes::categories::router())
        .merge(routes::behavior_logs::router())
        .merge(routes::academic_logs::router());

    Ok(Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
