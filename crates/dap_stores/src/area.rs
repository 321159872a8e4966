use geo::{BoundingRect, GeodesicArea, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, JsonObject, feature::Id};
use jiff::Timestamp;
use serde_json::{Value, json};

use crate::bbox::BoundingBox;

/// One linear ring as `[lon, lat]` pairs.
pub type Ring = Vec<[f64; 2]>;

/// Exterior ring followed by the interior rings.
pub type PolygonRings = Vec<Ring>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaGeometryType {
    Polygon,
    MultiPolygon,
}

/// A stored avoid area. Geometries are kept as multi polygons and reported as
/// `Polygon` when they only have a single part.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaFeature {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub provider_id: Option<i64>,
    pub type_id: i64,
    pub sub_type_id: Option<i64>,
    pub geometry: MultiPolygon<f64>,
    /// Square meters
    pub area: f64,
    pub created: Timestamp,
}

pub fn polygon_rings(polygon: &Polygon<f64>) -> PolygonRings {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|coord| [coord.x, coord.y]).collect())
        .collect()
}

/// Geodesic area in square meters, rounded to two decimals.
pub fn geodesic_area(geometry: &MultiPolygon<f64>) -> f64 {
    (geometry.geodesic_area_unsigned() * 100.0).round() / 100.0
}

impl AreaFeature {
    pub fn geometry_type(&self) -> AreaGeometryType {
        if self.geometry.0.len() == 1 {
            AreaGeometryType::Polygon
        } else {
            AreaGeometryType::MultiPolygon
        }
    }

    /// Rings of a polygon typed feature, `None` for multi part features.
    pub fn polygon_rings(&self) -> Option<PolygonRings> {
        match self.geometry_type() {
            AreaGeometryType::Polygon => self.geometry.0.first().map(polygon_rings),
            AreaGeometryType::MultiPolygon => None,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from)
    }

    pub fn to_geojson(&self) -> Feature {
        let geometry = match (self.geometry_type(), self.geometry.0.first()) {
            (AreaGeometryType::Polygon, Some(polygon)) => geojson::Geometry::from(polygon),
            _ => geojson::Geometry::from(&self.geometry),
        };

        let mut properties = JsonObject::new();
        properties.insert("name".into(), json!(self.name));
        properties.insert("description".into(), json!(self.description));
        properties.insert("provider_id".into(), json!(self.provider_id));
        properties.insert("d_type_id".into(), json!(self.type_id));
        properties.insert("ds_type_id".into(), json!(self.sub_type_id));
        properties.insert("area".into(), json!(self.area));
        properties.insert("created".into(), Value::String(self.created.to_string()));

        Feature {
            bbox: self.bbox().map(|bbox| bbox.to_vec()),
            geometry: Some(geometry),
            id: Some(Id::Number(self.id.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Result of an area lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaFeatureCollection {
    pub features: Vec<AreaFeature>,
}

impl AreaFeatureCollection {
    pub fn new(features: Vec<AreaFeature>) -> Self {
        AreaFeatureCollection { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Rings of every polygon typed feature, in collection order.
    pub fn polygon_rings(&self) -> Vec<PolygonRings> {
        self.features
            .iter()
            .filter_map(AreaFeature::polygon_rings)
            .collect()
    }

    /// Union of the features' boxes, `[0, 0, 0, 0]` when there are none.
    pub fn bbox(&self) -> BoundingBox {
        self.features
            .iter()
            .filter_map(AreaFeature::bbox)
            .reduce(|acc, bbox| acc.union(&bbox))
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: Some(self.bbox().to_vec()),
            features: self.features.iter().map(AreaFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use geo::polygon;

    use super::*;

    pub fn square_area(id: i64, x: f64, y: f64, size: f64) -> AreaFeature {
        let polygon = polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ];
        let geometry = MultiPolygon::new(vec![polygon]);

        AreaFeature {
            id,
            name: format!("area {}", id),
            description: None,
            provider_id: Some(1),
            type_id: 1,
            sub_type_id: None,
            area: geodesic_area(&geometry),
            geometry,
            created: "2022-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_single_part_is_a_polygon() {
        let area = square_area(1, 0.0, 0.0, 1.0);

        assert_eq!(area.geometry_type(), AreaGeometryType::Polygon);
        let rings = area.polygon_rings().unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].first(), Some(&[0.0, 0.0]));
        assert_eq!(rings[0].len(), 5);
    }

    #[test]
    fn test_multi_part_has_no_polygon_rings() {
        let mut area = square_area(1, 0.0, 0.0, 1.0);
        let other = square_area(2, 3.0, 3.0, 1.0);
        area.geometry.0.extend(other.geometry.0);

        assert_eq!(area.geometry_type(), AreaGeometryType::MultiPolygon);
        assert!(area.polygon_rings().is_none());
    }

    #[test]
    fn test_geodesic_area_is_positive() {
        let area = square_area(1, 8.68, 49.41, 0.01);
        // roughly 1.1km by 0.72km
        assert!(area.area > 700_000.0 && area.area < 900_000.0);
    }

    #[test]
    fn test_collection_bbox() {
        let empty = AreaFeatureCollection::default();
        assert_eq!(empty.bbox().to_array(), [0.0, 0.0, 0.0, 0.0]);

        let collection = AreaFeatureCollection::new(vec![
            square_area(1, 0.0, 0.0, 1.0),
            square_area(2, -2.0, 3.0, 1.0),
        ]);
        assert_eq!(collection.bbox().to_array(), [-2.0, 0.0, 1.0, 4.0]);
    }

    #[test]
    fn test_to_geojson() {
        let collection = AreaFeatureCollection::new(vec![square_area(7, 0.0, 0.0, 1.0)]);
        let value = serde_json::to_value(collection.to_geojson()).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(value["features"][0]["id"], 7);
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(value["features"][0]["properties"]["d_type_id"], 1);
        assert_eq!(
            value["features"][0]["properties"]["created"],
            "2022-01-01T00:00:00Z"
        );
    }
}
