pub mod area;
pub mod area_store;
pub mod bbox;
pub mod datetime;
pub mod error;
pub mod speed_profiles;
