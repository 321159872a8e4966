pub mod canonical;
pub mod difference;
pub mod error;
pub mod gateway;
pub mod geometry;
pub mod lookup_box;
pub mod merger;
pub mod request;
pub mod response;
pub mod speed;
pub mod units;
pub mod validation;

pub use error::GatewayError;
pub use gateway::{Gateway, GatewayParams, GatewayResponse, PathOptions};
