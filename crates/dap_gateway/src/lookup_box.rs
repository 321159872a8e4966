use dap_ors::ors_api::{OrsApi, OrsProfile};
use dap_stores::bbox::BoundingBox;
use geo::{Destination, Haversine, Point};
use thiserror::Error;
use tracing::debug;

use crate::{
    request::{Coordinate, DirectionsRequest, IsochronesRequest, OrsRequest, RangeType},
    units::{Kmh, Meters, Seconds},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupBoxError {
    #[error("A {request} request cannot target the {target} API")]
    ApiMismatch {
        request: &'static str,
        target: &'static str,
    },

    #[error("The request has no coordinates to derive a lookup box from")]
    NoCoordinates,
}

/// Speed used to turn an isochrone time range into a distance.
pub fn nominal_speed(profile: OrsProfile) -> Kmh {
    let name = profile.as_str();

    if name.starts_with("cycling") {
        Kmh::new(20.0)
    } else if name.starts_with("foot") {
        Kmh::new(5.0)
    } else if name.starts_with("wheelchair") {
        Kmh::new(4.0)
    } else {
        Kmh::new(80.0)
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Wraps a longitude that left `[-180, 180]` by one turn.
pub fn restrict_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

pub fn restrict_latitude(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

fn restricted(west: f64, south: f64, east: f64, north: f64) -> BoundingBox {
    BoundingBox::new(
        restrict_longitude(round6(west)),
        restrict_latitude(round6(south)),
        restrict_longitude(round6(east)),
        restrict_latitude(round6(north)),
    )
}

/// Grows each side by `percentage` of the box extent along that axis plus
/// `distance` degrees.
pub fn buffer_bbox(bbox: &BoundingBox, percentage: f64, distance: f64) -> BoundingBox {
    let dx = bbox.width() * percentage / 100.0 + distance;
    let dy = bbox.height() * percentage / 100.0 + distance;

    restricted(
        bbox.west - dx,
        bbox.south - dy,
        bbox.east + dx,
        bbox.north + dy,
    )
}

/// Grows every side by half of `looseness` percent of the longer side, so
/// the maximum looseness of 200 adds one full extent on each side.
pub fn loosen_bbox(bbox: &BoundingBox, looseness: i64) -> BoundingBox {
    let factor = looseness as f64 / 200.0;
    let leeway = bbox.width().max(bbox.height()) * factor;

    restricted(
        bbox.west - leeway,
        bbox.south - leeway,
        bbox.east + leeway,
        bbox.north + leeway,
    )
}

/// Box spanned by the four cardinal points at `radius` around `center`.
pub fn bbox_around(center: Coordinate, radius: Meters) -> BoundingBox {
    let origin = Point::new(center[0], center[1]);

    let mut bbox = BoundingBox::default();
    for bearing in [0.0, 90.0, 180.0, 270.0] {
        let destination = Haversine.destination(origin, bearing, radius.value());
        bbox.extend(destination);
    }

    restricted(bbox.west, bbox.south, bbox.east, bbox.north)
}

fn directions_box(request: &DirectionsRequest) -> Result<BoundingBox, LookupBoxError> {
    let bbox = BoundingBox::from_coords(
        request
            .coordinates
            .iter()
            .map(|coordinate| (coordinate[0], coordinate[1])),
    )
    .ok_or(LookupBoxError::NoCoordinates)?;

    let looseness = request.common.portal_options.bounds_looseness;
    if looseness > 0 {
        Ok(loosen_bbox(&bbox, looseness))
    } else {
        Ok(bbox)
    }
}

/// Largest range of the request, in meters.
pub fn isochrone_radius(request: &IsochronesRequest, profile: OrsProfile) -> Meters {
    let max_range = request.range.iter().copied().fold(0.0, f64::max);

    match request.range_type.unwrap_or_default() {
        RangeType::Time => Seconds::new(max_range) * nominal_speed(profile),
        RangeType::Distance => Meters::new(max_range),
    }
}

fn isochrones_box(
    request: &IsochronesRequest,
    profile: OrsProfile,
) -> Result<BoundingBox, LookupBoxError> {
    let radius = isochrone_radius(request, profile);

    request
        .locations
        .iter()
        .map(|location| bbox_around(*location, radius))
        .reduce(|acc, bbox| acc.union(&bbox))
        .ok_or(LookupBoxError::NoCoordinates)
}

/// Box used to look up avoid areas for `request`.
pub fn compute_lookup_box(
    request: &OrsRequest,
    api: OrsApi,
    profile: OrsProfile,
) -> Result<BoundingBox, LookupBoxError> {
    if request.api() != api {
        return Err(LookupBoxError::ApiMismatch {
            request: request.api().as_str(),
            target: api.as_str(),
        });
    }

    if let Some(bbox) = request.portal_options().disaster_area_filter.bbox {
        return Ok(bbox);
    }

    let bbox = match request {
        OrsRequest::Directions(directions) => directions_box(directions)?,
        OrsRequest::Isochrones(isochrones) => isochrones_box(isochrones, profile)?,
    };

    debug!("Lookup box for {} {}: {:?}", api, profile, bbox.to_array());

    Ok(bbox)
}
