use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use dap_gateway::{
    PathOptions, loc, request::OrsRequest, validation::ValidationErrors,
};
use serde_json::Value;

use crate::{
    error::ApiError,
    routing::{
        ORS_AUTHORIZATION_HEADER, RoutingResponse,
        path::{ResponseFormat, RoutingPath, RoutingPathWithFormat},
    },
    state::AppState,
};

fn caller_authorization(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    headers
        .get(ORS_AUTHORIZATION_HEADER)
        .map(|value| {
            value.to_str().map_err(|_| {
                ApiError::BadRequest(format!("Invalid {} header", ORS_AUTHORIZATION_HEADER))
            })
        })
        .transpose()
}

async fn handle_post(
    state: &AppState,
    path: PathOptions,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RoutingResponse, ApiError> {
    let body: Value = serde_json::from_slice(body).map_err(|error| {
        ValidationErrors::single(loc!["body"], format!("Invalid JSON body: {}", error))
    })?;
    let request = OrsRequest::from_value(path.api, body)?;

    let response = state
        .gateway
        .handle(request, &path, caller_authorization(headers)?)
        .await?;

    Ok(RoutingResponse(response))
}

/// Full request in the body, answered in the default format of the API.
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<RoutingPath>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<RoutingResponse, ApiError> {
    let path = path.parse(ResponseFormat::ApiDefault)?;

    handle_post(&state, path, &headers, &body).await
}

pub async fn post_response_type_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<RoutingPathWithFormat>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<RoutingResponse, ApiError> {
    let path = path.parse()?;

    handle_post(&state, path, &headers, &body).await
}
