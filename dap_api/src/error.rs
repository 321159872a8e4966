use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dap_gateway::{GatewayError, validation::ValidationErrors};
use dap_ors::client::OrsError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    BadRequest(String),
    Domain { code: u32, message: String },
    BadGateway(String),
    GatewayTimeout(String),
    InternalServerError(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        if let Some(code) = error.code() {
            return ApiError::Domain {
                code,
                message: error.to_string(),
            };
        }

        match error {
            GatewayError::Validation(errors) => ApiError::Validation(errors),
            GatewayError::LookupBox(error) => ApiError::BadRequest(error.to_string()),
            GatewayError::Backend(OrsError::Timeout(error)) => {
                ApiError::GatewayTimeout(format!("Backend did not answer in time: {}", error))
            }
            GatewayError::Backend(OrsError::InvalidHeader(name)) => {
                ApiError::BadRequest(format!("Invalid {} value", name))
            }
            GatewayError::Backend(error) => ApiError::BadGateway(error.to_string()),
            GatewayError::InvalidBackendResponse(error) => {
                ApiError::BadGateway(format!("Backend response could not be read: {}", error))
            }
            error => ApiError::InternalServerError(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": errors })),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
            }
            ApiError::Domain { code, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "code": code, "message": message })),
            )
                .into_response(),
            ApiError::BadGateway(message) => {
                error!("Backend failure: {}", message);
                (StatusCode::BAD_GATEWAY, Json(json!({ "detail": message }))).into_response()
            }
            ApiError::GatewayTimeout(message) => {
                error!("Backend timeout: {}", message);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(json!({ "detail": message })),
                )
                    .into_response()
            }
            ApiError::InternalServerError(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": message })),
                )
                    .into_response()
            }
        }
    }
}
