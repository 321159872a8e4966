pub mod get_handler;
pub mod path;
pub mod post_handler;
pub mod routes;

use axum::http::{HeaderValue, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use dap_gateway::GatewayResponse;

/// Header carrying the caller's backend credentials on POST requests.
pub const ORS_AUTHORIZATION_HEADER: &str = "ORS-Authorization";

pub struct RoutingResponse(pub GatewayResponse);

impl IntoResponse for RoutingResponse {
    fn into_response(self) -> Response {
        let GatewayResponse {
            status,
            body,
            content_type,
        } = self.0;

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = (status, body).into_response();

        if let Ok(content_type) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }

        response
    }
}
