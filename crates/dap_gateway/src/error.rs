use dap_ors::client::OrsError;
use dap_stores::error::StoreError;
use thiserror::Error;

use crate::{geometry::GeometryError, lookup_box::LookupBoxError, validation::ValidationErrors};

/// Code reported when a referenced speed profile does not exist.
pub const SPEED_PROFILE_NOT_FOUND_CODE: u32 = 6404;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Custom speeds with id '{0}' do not exist")]
    SpeedProfileNotFound(i64),

    #[error(transparent)]
    LookupBox(#[from] LookupBoxError),

    #[error("Store lookup failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] OrsError),

    #[error("Backend response could not be read: {0}")]
    InvalidBackendResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl GatewayError {
    /// Code for errors reported as `{code, message}`.
    pub fn code(&self) -> Option<u32> {
        match self {
            GatewayError::SpeedProfileNotFound(_) => Some(SPEED_PROFILE_NOT_FOUND_CODE),
            _ => None,
        }
    }
}
