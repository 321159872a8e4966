use dap_ors::ors_api::OrsApi;
use dap_stores::{
    area::{PolygonRings, Ring},
    bbox::BoundingBox,
    datetime::{DateTimeFilter, DateTimeFilterError},
    speed_profiles::SpeedProfileContent,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    loc,
    validation::{
        Loc, ValidationErrors, check_coordinate, is_valid_latitude, is_valid_longitude,
    },
};

/// `[lon, lat]`
pub type Coordinate = [f64; 2];

pub const MAX_BOUNDS_LOOSENESS: i64 = 200;

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisasterAreaFilter {
    /// Replaces the box derived from the request geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// RFC 3339 instant or `start/end` interval on the area creation time.
    #[serde(default, alias = "date_time", skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(default, alias = "d_type_id", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
}

impl DisasterAreaFilter {
    pub fn datetime_filter(&self) -> Result<Option<DateTimeFilter>, DateTimeFilterError> {
        self.datetime
            .as_deref()
            .map(str::parse::<DateTimeFilter>)
            .transpose()
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        if let Some(bbox) = &self.bbox {
            let bbox_loc = || loc!["body", "portal_options", "disaster_area_filter", "bbox"];

            if !is_valid_longitude(bbox.west) || !is_valid_longitude(bbox.east) {
                errors.push(bbox_loc(), "longitudes must be between -180 and 180");
            }
            if !is_valid_latitude(bbox.south) || !is_valid_latitude(bbox.north) {
                errors.push(bbox_loc(), "latitudes must be between -90 and 90");
            }
            if bbox.is_empty() {
                errors.push(bbox_loc(), "west must not exceed east and south must not exceed north");
            }
        }

        if let Err(error) = self.datetime_filter() {
            errors.push(
                loc!["body", "portal_options", "disaster_area_filter", "datetime"],
                error.to_string(),
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub debug: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub return_areas_in_response: bool,

    /// Percentage in `0..=200` by which the lookup box is widened.
    #[serde(default, deserialize_with = "null_as_default")]
    pub bounds_looseness: i64,

    /// Issue a second call without avoid areas and return the delta.
    #[serde(default, deserialize_with = "null_as_default")]
    pub generate_difference: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub disaster_area_filter: DisasterAreaFilter,

    /// Name of an alternative backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ors_server: Option<String>,
}

impl PortalOptions {
    fn validate(&self, errors: &mut ValidationErrors) {
        if !(0..=MAX_BOUNDS_LOOSENESS).contains(&self.bounds_looseness) {
            errors.push(
                loc!["body", "portal_options", "bounds_looseness"],
                format!("ensure this value is between 0 and {}", MAX_BOUNDS_LOOSENESS),
            );
        }

        self.disaster_area_filter.validate(errors);
    }
}

/// Areas the backend routes around. Always a multi polygon once areas have
/// been merged in. A missing `type` reads as `MultiPolygon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "RawAvoidPolygons")]
pub enum AvoidPolygons {
    Polygon { coordinates: PolygonRings },
    MultiPolygon { coordinates: Vec<PolygonRings> },
}

#[derive(Debug, Default, Deserialize)]
enum AvoidPolygonsType {
    Polygon,
    #[default]
    MultiPolygon,
}

#[derive(Debug, Deserialize)]
struct RawAvoidPolygons {
    #[serde(rename = "type", default)]
    kind: AvoidPolygonsType,
    coordinates: Value,
}

impl TryFrom<RawAvoidPolygons> for AvoidPolygons {
    type Error = serde_json::Error;

    fn try_from(raw: RawAvoidPolygons) -> Result<Self, Self::Error> {
        Ok(match raw.kind {
            AvoidPolygonsType::Polygon => AvoidPolygons::Polygon {
                coordinates: serde_json::from_value(raw.coordinates)?,
            },
            AvoidPolygonsType::MultiPolygon => AvoidPolygons::MultiPolygon {
                coordinates: serde_json::from_value(raw.coordinates)?,
            },
        })
    }
}

impl Default for AvoidPolygons {
    fn default() -> Self {
        AvoidPolygons::MultiPolygon {
            coordinates: Vec::new(),
        }
    }
}

impl AvoidPolygons {
    pub fn is_empty(&self) -> bool {
        match self {
            AvoidPolygons::Polygon { coordinates } => coordinates.is_empty(),
            AvoidPolygons::MultiPolygon { coordinates } => coordinates.is_empty(),
        }
    }

    /// Appends `polygons`, promoting a `Polygon` to a `MultiPolygon` first.
    /// Nothing changes when `polygons` is empty.
    pub fn merge(&mut self, polygons: Vec<PolygonRings>) {
        if polygons.is_empty() {
            return;
        }

        let mut merged = match std::mem::take(self) {
            AvoidPolygons::Polygon { coordinates } => vec![coordinates],
            AvoidPolygons::MultiPolygon { coordinates } => coordinates,
        };
        merged.extend(polygons);

        *self = AvoidPolygons::MultiPolygon {
            coordinates: merged,
        };
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        let base = || loc!["body", "options", "avoid_polygons", "coordinates"];

        if self.is_empty() {
            errors.push(base(), "ensure this value has at least 1 items");
            return;
        }

        match self {
            AvoidPolygons::Polygon { coordinates } => validate_rings(errors, base(), coordinates),
            AvoidPolygons::MultiPolygon { coordinates } => {
                for (index, polygon) in coordinates.iter().enumerate() {
                    let mut loc = base();
                    loc.push(Loc::Index(index));
                    if polygon.is_empty() {
                        errors.push(loc, "a polygon needs an exterior ring");
                    } else {
                        validate_rings(errors, loc, polygon);
                    }
                }
            }
        }
    }
}

fn validate_rings(errors: &mut ValidationErrors, loc: Vec<Loc>, rings: &[Ring]) {
    for (index, ring) in rings.iter().enumerate() {
        let mut ring_loc = loc.clone();
        ring_loc.push(Loc::Index(index));

        if ring.len() < 4 {
            errors.push(ring_loc.clone(), "a linear ring needs at least 4 positions");
        } else if ring.first() != ring.last() {
            errors.push(ring_loc.clone(), "a linear ring must be closed");
        }

        for (position, coordinate) in ring.iter().enumerate() {
            let mut position_loc = ring_loc.clone();
            position_loc.push(Loc::Index(position));
            check_coordinate(errors, position_loc, *coordinate);
        }
    }
}

/// The request's `options` object. Anything besides `avoid_polygons` is
/// forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_polygons: Option<AvoidPolygons>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Options {
    pub fn has_avoid_polygons(&self) -> bool {
        self.avoid_polygons
            .as_ref()
            .is_some_and(|avoid_polygons| !avoid_polygons.is_empty())
    }

    pub fn merge_avoid_polygons(&mut self, polygons: Vec<PolygonRings>) {
        if polygons.is_empty() {
            return;
        }

        self.avoid_polygons
            .get_or_insert_with(AvoidPolygons::default)
            .merge(polygons);
    }
}

/// Either the id of a stored speed profile or the profile itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserSpeedLimits {
    Reference(i64),
    Content(SpeedProfileContent),
}

/// Fields shared by every request type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub portal_options: PortalOptions,

    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Options,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_speed_limits: Option<UserSpeedLimits>,

    /// Unknown top level fields, e.g. `preference` or `api_key`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommonFields {
    fn validate(&self, errors: &mut ValidationErrors) {
        self.portal_options.validate(errors);

        if let Some(avoid_polygons) = &self.options.avoid_polygons {
            avoid_polygons.validate(errors);
        }

        if let Some(UserSpeedLimits::Content(content)) = &self.user_speed_limits {
            for (field, key) in content.unknown_classes() {
                errors.push(
                    loc!["body", "user_speed_limits", field, key.as_str()],
                    format!("'{}' is not a supported {} class", key, field),
                );
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub coordinates: Vec<Coordinate>,

    #[serde(flatten)]
    pub common: CommonFields,
}

impl DirectionsRequest {
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.coordinates.len() < 2 {
            errors.push(
                loc!["body", "coordinates"],
                "ensure this value has at least 2 items",
            );
        }

        for (index, coordinate) in self.coordinates.iter().enumerate() {
            check_coordinate(errors, loc!["body", "coordinates", index], *coordinate);
        }

        self.common.validate(errors);
    }
}

#[derive(Debug, Deserialize, Serialize, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    #[default]
    Time,
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsochronesRequest {
    pub locations: Vec<Coordinate>,

    /// Seconds for `time`, meters for `distance`.
    pub range: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_type: Option<RangeType>,

    /// Isochrone properties such as `area` or `total_pop`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,

    #[serde(flatten)]
    pub common: CommonFields,
}

impl IsochronesRequest {
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.locations.is_empty() {
            errors.push(loc!["body", "locations"], "ensure this value has at least 1 items");
        }

        for (index, location) in self.locations.iter().enumerate() {
            check_coordinate(errors, loc!["body", "locations", index], *location);
        }

        if self.range.is_empty() {
            errors.push(loc!["body", "range"], "ensure this value has at least 1 items");
        }

        for (index, range) in self.range.iter().enumerate() {
            if !range.is_finite() || *range <= 0.0 {
                errors.push(loc!["body", "range", index], "range values must be positive");
            }
        }

        self.common.validate(errors);
    }
}

/// A request body, typed by the backend API it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrsRequest {
    Directions(DirectionsRequest),
    Isochrones(IsochronesRequest),
}

impl OrsRequest {
    /// Parses and validates a body sent to `api`.
    pub fn from_value(api: OrsApi, body: Value) -> Result<Self, ValidationErrors> {
        let request = match api {
            OrsApi::Directions => serde_json::from_value(body).map(OrsRequest::Directions),
            OrsApi::Isochrones => serde_json::from_value(body).map(OrsRequest::Isochrones),
        }
        .map_err(|error| ValidationErrors::single(loc!["body"], error.to_string()))?;

        request.validate()?;

        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self {
            OrsRequest::Directions(request) => request.validate(&mut errors),
            OrsRequest::Isochrones(request) => request.validate(&mut errors),
        }

        errors.into_result()
    }

    pub fn api(&self) -> OrsApi {
        match self {
            OrsRequest::Directions(_) => OrsApi::Directions,
            OrsRequest::Isochrones(_) => OrsApi::Isochrones,
        }
    }

    pub fn common(&self) -> &CommonFields {
        match self {
            OrsRequest::Directions(request) => &request.common,
            OrsRequest::Isochrones(request) => &request.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonFields {
        match self {
            OrsRequest::Directions(request) => &mut request.common,
            OrsRequest::Isochrones(request) => &mut request.common,
        }
    }

    pub fn portal_options(&self) -> &PortalOptions {
        &self.common().portal_options
    }

    pub fn options(&self) -> &Options {
        &self.common().options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.common_mut().options
    }

    pub fn attributes(&self) -> &[String] {
        match self {
            OrsRequest::Directions(_) => &[],
            OrsRequest::Isochrones(request) => &request.attributes,
        }
    }
}
