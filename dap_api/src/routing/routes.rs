use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    routing::{
        get_handler::get_handler,
        post_handler::{post_handler, post_response_type_handler},
    },
    state::AppState,
};

pub fn routing_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/{portal_mode}/{ors_api}/{ors_profile}",
            get(get_handler).post(post_handler),
        )
        .route(
            "/{portal_mode}/{ors_api}/{ors_profile}/{ors_response_type}",
            post(post_response_type_handler),
        )
        .with_state(state)
}
