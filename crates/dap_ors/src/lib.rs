pub mod client;
pub mod headers;
pub mod ors_api;
