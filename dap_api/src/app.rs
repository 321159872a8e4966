use std::sync::Arc;

use axum::{Router, http::Method, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{
    config::{Config, CorsOrigins},
    health::health_handler,
    routing::routes::routing_routes,
    state::AppState,
};

fn cors_layer(origins: &CorsOrigins) -> Option<CorsLayer> {
    let allow_origin = match origins {
        CorsOrigins::Disabled => return None,
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(origins) => AllowOrigin::list(origins.iter().cloned()),
    };

    Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_origin(allow_origin)
            .allow_headers(Any),
    )
}

/// Every route of the service, mounted under the configured prefix.
pub fn app(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .nest("/routing", routing_routes(state))
        .route("/health", get(health_handler));

    let app = if config.api_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&config.api_prefix, api)
    };

    match cors_layer(&config.cors_origins) {
        Some(cors_layer) => app.layer(ServiceBuilder::new().layer(cors_layer)),
        None => app,
    }
}
