use std::{io::BufReader, path::Path};

use async_trait::async_trait;
use geo::{Intersects, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, JsonObject, feature::Id};
use jiff::Timestamp;
use rstar::{AABB, RTree, RTreeObject};
use tracing::{debug, info};

use crate::{
    area::{AreaFeature, AreaFeatureCollection, geodesic_area},
    bbox::BoundingBox,
    datetime::DateTimeFilter,
    error::StoreError,
};

pub const DEFAULT_AREA_QUERY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AreaQuery {
    pub bbox: BoundingBox,
    pub type_id: Option<i64>,
    pub datetime: Option<DateTimeFilter>,
    pub limit: usize,
}

impl AreaQuery {
    pub fn new(bbox: BoundingBox) -> Self {
        AreaQuery {
            bbox,
            type_id: None,
            datetime: None,
            limit: DEFAULT_AREA_QUERY_LIMIT,
        }
    }

    fn accepts(&self, feature: &AreaFeature) -> bool {
        self.type_id.is_none_or(|type_id| feature.type_id == type_id)
            && self
                .datetime
                .is_none_or(|datetime| datetime.matches(feature.created))
            && self.bbox.to_rect().intersects(&feature.geometry)
    }
}

/// Source of avoid areas.
#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Features intersecting `query.bbox` that pass the filters, largest area
    /// first.
    async fn query(&self, query: &AreaQuery) -> Result<AreaFeatureCollection, StoreError>;
}

struct IndexedArea {
    envelope: AABB<[f64; 2]>,
    feature: AreaFeature,
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

#[derive(Default)]
pub struct InMemoryAreaStore {
    tree: RTree<IndexedArea>,
}

impl InMemoryAreaStore {
    pub fn new(features: Vec<AreaFeature>) -> Self {
        let entries = features
            .into_iter()
            .filter_map(|feature| {
                let envelope = feature.bbox()?.to_aabb();
                Some(IndexedArea { envelope, feature })
            })
            .collect();

        InMemoryAreaStore {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn from_geojson_file(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)?;
        let geojson: GeoJson = serde_json::from_reader(BufReader::new(file))?;

        let collection = FeatureCollection::try_from(geojson)?;
        let features = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| area_from_geojson(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Loaded {} avoid areas from {}",
            features.len(),
            path.display()
        );

        Ok(Self::new(features))
    }
}

#[async_trait]
impl AreaStore for InMemoryAreaStore {
    async fn query(&self, query: &AreaQuery) -> Result<AreaFeatureCollection, StoreError> {
        let mut features: Vec<AreaFeature> = self
            .tree
            .locate_in_envelope_intersecting(&query.bbox.to_aabb())
            .map(|entry| &entry.feature)
            .filter(|feature| query.accepts(feature))
            .cloned()
            .collect();

        features.sort_by(|a, b| b.area.total_cmp(&a.area).then(a.id.cmp(&b.id)));
        features.truncate(query.limit);

        debug!(
            "InMemoryAreaStore: {} areas match {:?}",
            features.len(),
            query.bbox.to_array()
        );

        Ok(AreaFeatureCollection::new(features))
    }
}

fn property_i64(properties: &JsonObject, key: &str) -> Option<i64> {
    properties.get(key).and_then(|value| value.as_i64())
}

fn property_str(properties: &JsonObject, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::to_owned)
}

fn area_from_geojson(index: usize, feature: geojson::Feature) -> Result<AreaFeature, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidFeature {
        index,
        reason: reason.to_owned(),
    };

    let id = match &feature.id {
        Some(Id::Number(number)) => number.as_i64().ok_or_else(|| invalid("id is not an integer"))?,
        Some(Id::String(_)) => return Err(invalid("id is not an integer")),
        None => index as i64 + 1,
    };

    let geometry = feature
        .geometry
        .clone()
        .ok_or_else(|| invalid("feature has no geometry"))?;
    let geometry: MultiPolygon<f64> = match geo_types::Geometry::<f64>::try_from(geometry)? {
        geo_types::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        geo_types::Geometry::MultiPolygon(multi_polygon) => multi_polygon,
        _ => return Err(invalid("geometry is not a polygon or multi polygon")),
    };

    let properties = feature.properties.unwrap_or_default();
    let type_id = property_i64(&properties, "d_type_id")
        .or_else(|| property_i64(&properties, "type_id"))
        .ok_or_else(|| invalid("d_type_id is missing"))?;

    let created = property_str(&properties, "created")
        .ok_or_else(|| invalid("created is missing"))?
        .parse::<Timestamp>()
        .map_err(|_| invalid("created is not an RFC 3339 timestamp"))?;

    let area = properties
        .get("area")
        .and_then(|value| value.as_f64())
        .unwrap_or_else(|| geodesic_area(&geometry));

    Ok(AreaFeature {
        id,
        name: property_str(&properties, "name").unwrap_or_default(),
        description: property_str(&properties, "description"),
        provider_id: property_i64(&properties, "provider_id"),
        type_id,
        sub_type_id: property_i64(&properties, "ds_type_id"),
        geometry,
        area,
        created,
    })
}
