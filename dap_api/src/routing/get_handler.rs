use std::sync::Arc;

use axum::extract::{Path, Query, State};
use dap_gateway::{
    loc,
    request::{Coordinate, OrsRequest},
    validation::ValidationErrors,
};
use dap_ors::ors_api::{OrsApi, OrsResponseType};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ApiError,
    routing::{
        RoutingResponse,
        path::{ResponseFormat, RoutingPath},
    },
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct GetRoutingQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub api_key: Option<String>,
    pub debug: Option<String>,
}

/// Parses a `lon,lat` query parameter. `label` is used in the error messages.
fn parse_coordinate(value: Option<&str>, label: &str) -> Result<Coordinate, ApiError> {
    let value = value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} coordinates parameter missing", label)))?;

    let invalid = || ApiError::BadRequest(format!("{} coordinates parameter invalid", label));

    let parts: Vec<&str> = value.split(',').collect();
    let [lon, lat] = parts.as_slice() else {
        return Err(invalid());
    };

    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;

    Ok([lon, lat])
}

fn parse_debug(value: Option<&str>) -> Result<bool, ValidationErrors> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ValidationErrors::single(
            loc!["query", "debug"],
            "value could not be parsed to a boolean",
        )),
    }
}

/// Simplified directions query between two points, answered as GeoJSON.
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<RoutingPath>,
    Query(query): Query<GetRoutingQuery>,
) -> Result<RoutingResponse, ApiError> {
    let path = path.parse(ResponseFormat::Fixed(OrsResponseType::Geojson))?;

    if path.api != OrsApi::Directions {
        return Err(ValidationErrors::single(
            loc!["path", "ors_api"],
            "GET requests are only supported by the directions API",
        )
        .into());
    }

    let start = parse_coordinate(query.start.as_deref(), "Start")?;
    let end = parse_coordinate(query.end.as_deref(), "End")?;
    let debug = parse_debug(query.debug.as_deref())?;

    let request = OrsRequest::from_value(
        path.api,
        json!({
            "coordinates": [start, end],
            "portal_options": { "debug": debug },
        }),
    )?;

    let response = state
        .gateway
        .handle(request, &path, query.api_key.as_deref())
        .await?;

    Ok(RoutingResponse(response))
}
