pub mod health;
pub mod knowledge;
pub mod pipelines;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{handlers::execute, state::AppState};

/// Assemble the full application router.
///
/// No compression layer: the execute route streams incremental NDJSON and
/// must not be buffered by a compressing encoder.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Pipelines
        .route("/pipelines", post(pipelines::create_pipeline))
        .route("/pipelines", get(pipelines::list_pipelines))
        .route("/pipelines/:pipeline_id", get(pipelines::get_pipeline))
        .route("/pipelines/:pipeline_id", put(pipelines::update_pipeline))
        .route("/pipelines/:pipeline_id", delete(pipelines::delete_pipeline))
        // Knowledge base
        .route(
            "/pipelines/:pipeline_id/knowledge/clear",
            post(knowledge::clear_knowledge),
        )
        // Execution
        .route("/execute", post(execute::execute_pipeline));

    Router::new()
        .nest("/", api_routes)
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(300)))
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &crate::config::Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
