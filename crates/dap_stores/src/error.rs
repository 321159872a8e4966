use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store file is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Feature {index} is invalid: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Speed profile {id} is invalid: {reason}")]
    InvalidSpeedProfile { id: String, reason: String },
}
