use dap_stores::bbox::BoundingBox;
use geo::{
    Area, BooleanOps, BoundingRect, Coord, Geometry, Line, LineString, MultiLineString,
    MultiPolygon, unary_union,
};
use thiserror::Error;
use tracing::warn;

/// Polyline precision used by the backend.
pub const POLYLINE_PRECISION: u32 = 5;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Invalid GeoJSON geometry: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid encoded polyline: {0}")]
    Polyline(String),

    #[error("Cannot compute the difference of a {0} and a {1}")]
    Unsupported(&'static str, &'static str),
}

fn type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn as_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(multi_polygon) => Some(multi_polygon.clone()),
        _ => None,
    }
}

fn as_multi_line_string(geometry: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::LineString(line_string) => Some(MultiLineString::new(vec![line_string.clone()])),
        Geometry::MultiLineString(multi_line_string) => Some(multi_line_string.clone()),
        _ => None,
    }
}

/// `minuend - subtrahend` for two polygonal or two lineal geometries, repaired.
/// `None` when nothing is left.
pub fn difference(
    minuend: &Geometry<f64>,
    subtrahend: &Geometry<f64>,
) -> Result<Option<Geometry<f64>>, GeometryError> {
    if let (Some(minuend), Some(subtrahend)) =
        (as_multi_polygon(minuend), as_multi_polygon(subtrahend))
    {
        let result = make_valid_polygons(&minuend.difference(&subtrahend));
        return Ok(simplify_multi_polygon(result));
    }

    if let (Some(minuend), Some(subtrahend)) =
        (as_multi_line_string(minuend), as_multi_line_string(subtrahend))
    {
        let result = make_valid_lines(&line_difference(&minuend, &subtrahend));
        return Ok(simplify_multi_line_string(result));
    }

    Err(GeometryError::Unsupported(
        type_name(minuend),
        type_name(subtrahend),
    ))
}

fn simplify_multi_polygon(mut geometry: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry.0.len() {
        0 => None,
        1 => geometry.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(geometry)),
    }
}

fn simplify_multi_line_string(mut geometry: MultiLineString<f64>) -> Option<Geometry<f64>> {
    match geometry.0.len() {
        0 => None,
        1 => geometry.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(geometry)),
    }
}

/// Re-unions the parts and drops zero area slivers.
pub fn make_valid_polygons(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let unioned = unary_union(geometry.0.iter());

    MultiPolygon::new(
        unioned
            .0
            .into_iter()
            .filter(|polygon| polygon.unsigned_area() > EPSILON * EPSILON)
            .collect(),
    )
}

fn line_length(line_string: &LineString<f64>) -> f64 {
    line_string
        .lines()
        .map(|line| line.dx().hypot(line.dy()))
        .sum()
}

/// Drops repeated positions and zero length parts.
pub fn make_valid_lines(geometry: &MultiLineString<f64>) -> MultiLineString<f64> {
    MultiLineString::new(
        geometry
            .0
            .iter()
            .map(|line_string| {
                let mut coords: Vec<Coord<f64>> = line_string.0.clone();
                coords.dedup();
                LineString::new(coords)
            })
            .filter(|line_string| line_string.0.len() >= 2 && line_length(line_string) > EPSILON)
            .collect(),
    )
}

fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Parameter range of `segment` covered by `other` when both lie on the same
/// line.
fn collinear_overlap(segment: &Line<f64>, other: &Line<f64>) -> Option<(f64, f64)> {
    let direction = segment.delta();
    let length = direction.x.hypot(direction.y);

    let off_line = |point: Coord<f64>| (cross(direction, point - segment.start) / length).abs();
    if off_line(other.start) > EPSILON || off_line(other.end) > EPSILON {
        return None;
    }

    let squared = dot(direction, direction);
    let t0 = dot(other.start - segment.start, direction) / squared;
    let t1 = dot(other.end - segment.start, direction) / squared;

    let start = t0.min(t1).max(0.0);
    let end = t0.max(t1).min(1.0);

    if end - start > EPSILON {
        Some((start, end))
    } else {
        None
    }
}

fn point_at(segment: &Line<f64>, t: f64) -> Coord<f64> {
    if t <= 0.0 {
        segment.start
    } else if t >= 1.0 {
        segment.end
    } else {
        segment.start + segment.delta() * t
    }
}

/// Pieces of `segment` not covered by any of `others`.
fn uncovered_pieces(segment: &Line<f64>, others: &[Line<f64>]) -> Vec<Line<f64>> {
    let mut covered: Vec<(f64, f64)> = others
        .iter()
        .filter_map(|other| collinear_overlap(segment, other))
        .collect();
    covered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut pieces = Vec::new();
    let mut cursor = 0.0;
    for (start, end) in covered {
        if start > cursor + EPSILON {
            pieces.push(Line::new(point_at(segment, cursor), point_at(segment, start)));
        }
        cursor = f64::max(cursor, end);
    }

    if cursor < 1.0 - EPSILON {
        pieces.push(Line::new(point_at(segment, cursor), segment.end));
    }

    pieces
}

/// Removes every portion of `minuend` running along `subtrahend` and joins
/// what is left into continuous lines.
pub fn line_difference(
    minuend: &MultiLineString<f64>,
    subtrahend: &MultiLineString<f64>,
) -> MultiLineString<f64> {
    let others: Vec<Line<f64>> = subtrahend
        .0
        .iter()
        .flat_map(LineString::lines)
        .filter(|line| line.start != line.end)
        .collect();

    let mut result = Vec::new();
    for line_string in &minuend.0 {
        let mut current: Vec<Coord<f64>> = Vec::new();

        let pieces = line_string
            .lines()
            .filter(|segment| segment.start != segment.end)
            .flat_map(|segment| uncovered_pieces(&segment, &others));

        for piece in pieces {
            if current.last() == Some(&piece.start) {
                current.push(piece.end);
            } else {
                if current.len() >= 2 {
                    result.push(LineString::new(std::mem::take(&mut current)));
                }
                current = vec![piece.start, piece.end];
            }
        }

        if current.len() >= 2 {
            result.push(LineString::new(current));
        }
    }

    MultiLineString::new(result)
}

pub fn decode_polyline(encoded: &str) -> Result<LineString<f64>, GeometryError> {
    polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|error| GeometryError::Polyline(error.to_string()))
}

/// The line to report for a lineal geometry. A multi line keeps only its
/// longest part.
pub fn longest_line(geometry: &Geometry<f64>) -> Result<LineString<f64>, GeometryError> {
    match geometry {
        Geometry::LineString(line_string) => Ok(line_string.clone()),
        Geometry::MultiLineString(multi_line_string) => {
            if multi_line_string.0.len() > 1 {
                warn!(
                    "Keeping the longest of {} line parts",
                    multi_line_string.0.len()
                );
            }

            multi_line_string
                .0
                .iter()
                .max_by(|a, b| line_length(a).total_cmp(&line_length(b)))
                .cloned()
                .ok_or(GeometryError::Unsupported("empty MultiLineString", "polyline"))
        }
        other => Err(GeometryError::Unsupported(type_name(other), "polyline")),
    }
}

pub fn encode_polyline(line: &LineString<f64>) -> Result<String, GeometryError> {
    polyline::encode_coordinates(line.0.iter().copied(), POLYLINE_PRECISION)
        .map_err(|error| GeometryError::Polyline(error.to_string()))
}

pub fn geometry_bbox(geometry: &Geometry<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(BoundingBox::from)
}

pub fn from_geojson(geometry: geojson::Geometry) -> Result<Geometry<f64>, GeometryError> {
    Ok(Geometry::<f64>::try_from(geometry)?)
}

/// GeoJSON geometry carrying its own bbox.
pub fn to_geojson(geometry: &Geometry<f64>) -> geojson::Geometry {
    let mut geojson = geojson::Geometry::from(geometry);
    geojson.bbox = geometry_bbox(geometry).map(|bbox| bbox.to_vec());
    geojson
}
