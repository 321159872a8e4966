use dap_ors::ors_api::{OrsApi, OrsResponseType};
use dap_stores::bbox::BoundingBox;
use geo::Geometry;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::geometry::{
    GeometryError, decode_polyline, difference, encode_polyline, from_geojson,
    longest_line, to_geojson,
};

/// Items describing what changed between the call with avoid areas and the
/// call without.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Difference {
    pub features: Vec<Value>,
    pub bbox: Option<BoundingBox>,
}

/// Strict equality of `properties[key]`. A missing key never matches.
pub fn has_same_property(a: &Value, b: &Value, key: &str) -> bool {
    match (a["properties"].get(key), b["properties"].get(key)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// The candidate describing the same isochrone as `item`, i.e. with the same
/// `group_index` and `value`.
pub fn matching_isochrone<'a>(item: &Value, candidates: &'a [Value]) -> Option<&'a Value> {
    candidates.iter().find(|candidate| {
        has_same_property(item, candidate, "group_index") && has_same_property(item, candidate, "value")
    })
}

fn bbox_from_value(value: &Value) -> Option<BoundingBox> {
    match value.as_array()?.as_slice() {
        [west, south, east, north] => Some(BoundingBox::new(
            west.as_f64()?,
            south.as_f64()?,
            east.as_f64()?,
            north.as_f64()?,
        )),
        _ => None,
    }
}

/// Top level `bbox` of an item, falling back to its geometry's `bbox`.
pub fn item_bbox(item: &Value) -> Option<BoundingBox> {
    bbox_from_value(&item["bbox"]).or_else(|| bbox_from_value(&item["geometry"]["bbox"]))
}

/// Smallest box holding every given box.
pub fn aggregate_bbox(bboxes: impl IntoIterator<Item = BoundingBox>) -> Option<BoundingBox> {
    bboxes.into_iter().reduce(|acc, bbox| acc.union(&bbox))
}

fn read_geometry(
    item: &Value,
    response_type: OrsResponseType,
) -> Result<Option<Geometry<f64>>, GeometryError> {
    let geometry = &item["geometry"];

    match response_type {
        OrsResponseType::Json => geometry
            .as_str()
            .map(|encoded| decode_polyline(encoded).map(Geometry::LineString))
            .transpose(),
        OrsResponseType::Geojson | OrsResponseType::Gpx => {
            if geometry.is_null() {
                return Ok(None);
            }
            let geometry = geojson::Geometry::from_json_value(geometry.clone())?;
            from_geojson(geometry).map(Some)
        }
    }
}

fn subtract_numbers(minuend: &Value, subtrahend: &Value) -> Option<Value> {
    if let (Some(a), Some(b)) = (minuend.as_i64(), subtrahend.as_i64()) {
        return Some(json!(a - b));
    }

    Some(json!(minuend.as_f64()? - subtrahend.as_f64()?))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn properties_mut(item: &mut Value) -> Option<&mut Map<String, Value>> {
    item.get_mut("properties").and_then(Value::as_object_mut)
}

/// Sets each requested attribute of the base isochrone to `base - avoid`.
pub fn update_isochrone_attributes(item: &mut Value, avoid: &Value, attributes: &[String]) {
    let Some(properties) = properties_mut(item) else {
        return;
    };

    for attribute in attributes {
        let Some(avoid_value) = avoid["properties"].get(attribute) else {
            continue;
        };
        let Some(base_value) = properties.get(attribute) else {
            continue;
        };

        if let Some(delta) = subtract_numbers(base_value, avoid_value) {
            properties.insert(attribute.clone(), delta);
        }
    }
}

/// Sets the avoid route's distance and duration to `avoid - base` and drops
/// its way points and segments, which no longer describe the geometry.
pub fn update_route_summary(item: &mut Value, base: &Value, response_type: OrsResponseType) {
    let (container, base_container) = match response_type {
        OrsResponseType::Json => (item.as_object_mut(), base),
        _ => (properties_mut(item), &base["properties"]),
    };
    let Some(container) = container else {
        return;
    };

    container.remove("way_points");
    container.remove("segments");

    let Some(summary) = container.get_mut("summary").and_then(Value::as_object_mut) else {
        return;
    };

    for key in ["distance", "duration"] {
        let avoid_value = summary.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let base_value = base_container["summary"][key].as_f64().unwrap_or(0.0);

        summary.insert(key.to_owned(), json!(round1(avoid_value - base_value)));
    }
}

fn write_geometry(
    item: &mut Value,
    geometry: &Geometry<f64>,
    response_type: OrsResponseType,
) -> Result<(), GeometryError> {
    match response_type {
        OrsResponseType::Json => {
            let line = longest_line(geometry)?;
            item["geometry"] = Value::String(encode_polyline(&line)?);
            if let Some(bbox) = BoundingBox::from_coords(line.0.iter().copied()) {
                item["bbox"] = json!(bbox.to_vec());
            }
        }
        OrsResponseType::Geojson | OrsResponseType::Gpx => {
            item["geometry"] = json!(to_geojson(geometry));
        }
    }

    Ok(())
}

/// `minuend` with its geometry replaced by `minuend - subtrahend`, or `None`
/// when nothing is left or the items are the same.
fn subtract_item(
    minuend: &Value,
    subtrahend: &Value,
    response_type: OrsResponseType,
) -> Result<Option<Value>, GeometryError> {
    if minuend == subtrahend {
        return Ok(None);
    }

    let (Some(a), Some(b)) = (
        read_geometry(minuend, response_type)?,
        read_geometry(subtrahend, response_type)?,
    ) else {
        return Ok(None);
    };

    let Some(delta) = difference(&a, &b)? else {
        return Ok(None);
    };

    let mut item = minuend.clone();
    write_geometry(&mut item, &delta, response_type)?;

    Ok(Some(item))
}

fn isochrones_difference(
    avoid_items: &[Value],
    base_items: &[Value],
    attributes: &[String],
) -> Vec<Value> {
    let mut features = Vec::new();

    for base in base_items {
        let Some(avoid) = matching_isochrone(base, avoid_items) else {
            continue;
        };

        match subtract_item(base, avoid, OrsResponseType::Geojson) {
            Ok(Some(mut item)) => {
                update_isochrone_attributes(&mut item, avoid, attributes);
                features.push(item);
            }
            Ok(None) => {}
            Err(error) => warn!("Skipping isochrone difference: {}", error),
        }
    }

    features
}

fn directions_difference(
    avoid_items: &[Value],
    base_items: &[Value],
    response_type: OrsResponseType,
) -> Vec<Value> {
    if avoid_items.len() != base_items.len() {
        warn!(
            "Pairing {} routes with avoid areas against {} routes without by position",
            avoid_items.len(),
            base_items.len()
        );
    }

    let mut features = Vec::new();

    for (avoid, base) in avoid_items.iter().zip(base_items) {
        match subtract_item(avoid, base, response_type) {
            Ok(Some(mut item)) => {
                update_route_summary(&mut item, base, response_type);
                features.push(item);
            }
            Ok(None) => {}
            Err(error) => warn!("Skipping route difference: {}", error),
        }
    }

    features
}

/// Compares the result items of the call with avoid areas against those of
/// the call without. Items that cannot be compared are left out.
pub fn generate_difference(
    api: OrsApi,
    response_type: OrsResponseType,
    attributes: &[String],
    avoid_items: &[Value],
    base_items: &[Value],
) -> Difference {
    let features = match api {
        OrsApi::Isochrones => isochrones_difference(avoid_items, base_items, attributes),
        OrsApi::Directions => directions_difference(avoid_items, base_items, response_type),
    };

    let bbox = aggregate_bbox(features.iter().filter_map(item_bbox));

    debug!(
        "Difference of {} against {} items: {} features",
        avoid_items.len(),
        base_items.len(),
        features.len()
    );

    Difference { features, bbox }
}

#[cfg(test)]
mod tests {
    use geo::line_string;
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        })
    }

    fn isochrone(group_index: Value, value: Value, geometry: Value, total_pop: i64) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "group_index": group_index,
                "value": value,
                "center": [1.0, 1.0],
                "total_pop": total_pop
            },
            "geometry": geometry
        })
    }

    #[test]
    fn test_has_same_property_is_strict() {
        let a = json!({ "properties": { "value": 42 } });
        let b = json!({ "properties": { "value": "42" } });
        let c = json!({ "properties": { "value": 42 } });
        let d = json!({ "properties": {} });

        assert!(!has_same_property(&a, &b, "value"));
        assert!(has_same_property(&a, &c, "value"));
        assert!(!has_same_property(&a, &d, "value"));
        assert!(!has_same_property(&d, &d, "value"));
    }

    #[test]
    fn test_matching_isochrone() {
        let geometry = square(0.0, 0.0, 1.0, 1.0);
        let candidates = vec![
            isochrone(json!(0), json!(200.0), geometry.clone(), 0),
            isochrone(json!(0), json!(400.0), geometry.clone(), 0),
        ];

        let item = isochrone(json!(1), json!(200.0), geometry.clone(), 0);
        assert!(matching_isochrone(&item, &candidates).is_none());

        let item = isochrone(json!(0), json!(400.0), geometry, 0);
        assert_eq!(matching_isochrone(&item, &candidates), Some(&candidates[1]));
    }

    #[test]
    fn test_aggregate_bbox() {
        assert_eq!(
            aggregate_bbox([BoundingBox::new(0.0, 3.0, 0.0, 3.0)]).map(|bbox| bbox.to_array()),
            Some([0.0, 3.0, 0.0, 3.0])
        );
        assert_eq!(
            aggregate_bbox([
                BoundingBox::new(0.0, 0.0, 10.1, 5.0),
                BoundingBox::new(-4.1, 3.895, 0.1, 3.9),
            ])
            .map(|bbox| bbox.to_array()),
            Some([-4.1, 0.0, 10.1, 5.0])
        );
        assert_eq!(aggregate_bbox([]), None);
    }

    #[test]
    fn test_item_bbox_falls_back_to_geometry() {
        assert_eq!(
            item_bbox(&json!({ "bbox": [0, 1, 2, 3], "geometry": { "bbox": [5, 5, 6, 6] } }))
                .map(|bbox| bbox.to_array()),
            Some([0.0, 1.0, 2.0, 3.0])
        );
        assert_eq!(
            item_bbox(&json!({ "geometry": { "bbox": [5, 5, 6, 6] } })).map(|bbox| bbox.to_array()),
            Some([5.0, 5.0, 6.0, 6.0])
        );
        assert_eq!(item_bbox(&json!({ "geometry": "encoded" })), None);
    }

    #[test]
    fn test_identical_items_produce_nothing() {
        let item = isochrone(json!(0), json!(200.0), square(0.0, 0.0, 2.0, 2.0), 50);

        let difference = generate_difference(
            OrsApi::Isochrones,
            OrsResponseType::Geojson,
            &["total_pop".to_owned()],
            &[item.clone()],
            &[item],
        );

        assert!(difference.features.is_empty());
        assert_eq!(difference.bbox, None);
    }

    #[test]
    fn test_isochrones_difference() {
        let base = isochrone(json!(0), json!(200.0), square(0.0, 0.0, 2.0, 2.0), 50);
        let avoid = isochrone(json!(0), json!(200.0), square(0.0, 1.0, 2.0, 2.0), 20);
        let unmatched = isochrone(json!(1), json!(200.0), square(5.0, 5.0, 6.0, 6.0), 10);

        let difference = generate_difference(
            OrsApi::Isochrones,
            OrsResponseType::Geojson,
            &["total_pop".to_owned(), "area".to_owned()],
            &[avoid],
            &[base, unmatched],
        );

        assert_eq!(difference.features.len(), 1);
        let feature = &difference.features[0];
        assert_eq!(feature["properties"]["total_pop"], 30);
        assert_eq!(feature["geometry"]["type"], "Polygon");

        let bbox = difference.bbox.unwrap().to_array();
        for (actual, expected) in bbox.iter().zip([0.0, 0.0, 2.0, 1.0]) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_geojson_route_difference() {
        let avoid = json!({
            "type": "Feature",
            "bbox": [0, 3, 0, 3],
            "properties": {
                "summary": { "distance": 8.0, "duration": 15.0 },
                "segments": [{ "distance": 8.0 }],
                "way_points": [0, 4]
            },
            "geometry": {
                "type": "LineString",
                "coordinates": [[0, 0], [1, 1], [1, 2], [2, 2], [3, 3]]
            }
        });
        let base = json!({
            "type": "Feature",
            "bbox": [0, 0, 3, 3],
            "properties": {
                "summary": { "distance": 5.0, "duration": 5.0 },
                "way_points": [0, 1]
            },
            "geometry": { "type": "LineString", "coordinates": [[0, 0], [3, 3]] }
        });

        let difference = generate_difference(
            OrsApi::Directions,
            OrsResponseType::Geojson,
            &[],
            &[avoid],
            &[base],
        );

        assert_eq!(difference.features.len(), 1);
        let feature = &difference.features[0];
        assert_eq!(
            feature["geometry"],
            json!({
                "type": "LineString",
                "bbox": [1.0, 1.0, 2.0, 2.0],
                "coordinates": [[1.0, 1.0], [1.0, 2.0], [2.0, 2.0]]
            })
        );
        assert_eq!(feature["bbox"], json!([0, 3, 0, 3]));

        let properties = &feature["properties"];
        assert_eq!(properties["summary"]["distance"].as_f64(), Some(3.0));
        assert_eq!(properties["summary"]["duration"].as_f64(), Some(10.0));
        assert!(properties.get("segments").is_none());
        assert!(properties.get("way_points").is_none());

        assert_eq!(
            difference.bbox.map(|bbox| bbox.to_array()),
            Some([0.0, 3.0, 0.0, 3.0])
        );
    }

    #[test]
    fn test_json_route_difference() {
        let avoid_line = line_string![
            (x: 8.68, y: 49.41),
            (x: 8.69, y: 49.41),
            (x: 8.69, y: 49.42),
            (x: 8.7, y: 49.42),
        ];
        let base_line = line_string![
            (x: 8.68, y: 49.41),
            (x: 8.69, y: 49.41),
            (x: 8.7, y: 49.42),
        ];
        let encode = |line: geo::LineString<f64>| encode_polyline(&line).unwrap();

        let avoid = json!({
            "summary": { "distance": 5.11111, "duration": 10.0 },
            "segments": [],
            "way_points": [0, 3],
            "bbox": [8.68, 49.41, 8.7, 49.42],
            "geometry": encode(avoid_line)
        });
        let base = json!({
            "summary": { "distance": 8.0, "duration": 7.0 },
            "way_points": [0, 2],
            "bbox": [8.68, 49.41, 8.7, 49.42],
            "geometry": encode(base_line)
        });

        let difference = generate_difference(
            OrsApi::Directions,
            OrsResponseType::Json,
            &[],
            &[avoid],
            &[base],
        );

        assert_eq!(difference.features.len(), 1);
        let route = &difference.features[0];
        assert_eq!(route["summary"]["distance"].as_f64(), Some(-2.9));
        assert_eq!(route["summary"]["duration"].as_f64(), Some(3.0));
        assert!(route.get("segments").is_none());
        assert!(route.get("way_points").is_none());

        let geometry = decode_polyline(route["geometry"].as_str().unwrap()).unwrap();
        assert_eq!(geometry.0.len(), 3);
        assert_eq!(geometry.0[0], geo::Coord { x: 8.69, y: 49.41 });

        let bbox = item_bbox(route).unwrap();
        assert_eq!(bbox.to_array(), [8.69, 49.41, 8.7, 49.42]);
    }

    #[test]
    fn test_json_route_difference_keeps_longest_part() {
        let avoid_line = line_string![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 4.0, y: 2.0),
            (x: 4.0, y: 0.0),
        ];
        let base_line = line_string![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let encode = |line: geo::LineString<f64>| encode_polyline(&line).unwrap();

        let avoid = json!({ "summary": { "distance": 9.0, "duration": 9.0 }, "geometry": encode(avoid_line) });
        let base = json!({ "summary": { "distance": 1.0, "duration": 1.0 }, "geometry": encode(base_line) });

        let difference = generate_difference(
            OrsApi::Directions,
            OrsResponseType::Json,
            &[],
            &[avoid],
            &[base],
        );

        assert_eq!(difference.features.len(), 1);
        let route = &difference.features[0];
        let geometry = decode_polyline(route["geometry"].as_str().unwrap()).unwrap();
        assert_eq!(
            geometry,
            line_string![
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 4.0, y: 2.0),
                (x: 4.0, y: 0.0),
            ]
        );
        assert_eq!(item_bbox(route).unwrap().to_array(), [2.0, 0.0, 4.0, 2.0]);
    }

    #[test]
    fn test_unreadable_geometry_is_skipped() {
        let avoid = json!({ "properties": {}, "geometry": { "type": "Circle", "radius": 3 } });
        let base = json!({ "properties": {}, "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } });

        let difference = generate_difference(
            OrsApi::Directions,
            OrsResponseType::Geojson,
            &[],
            &[avoid],
            &[base],
        );

        assert!(difference.features.is_empty());
    }
}
