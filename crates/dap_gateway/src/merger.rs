use std::sync::Arc;

use dap_ors::ors_api::PortalMode;
use dap_stores::{
    area::AreaFeatureCollection,
    area_store::{AreaQuery, AreaStore},
    bbox::BoundingBox,
};
use tracing::{info, instrument};

use crate::{
    error::GatewayError, loc, request::OrsRequest, validation::ValidationErrors,
};

/// Injects stored avoid areas into a request.
pub struct AvoidAreaMerger {
    store: Arc<dyn AreaStore>,
    limit: usize,
}

impl AvoidAreaMerger {
    pub fn new(store: Arc<dyn AreaStore>, limit: usize) -> Self {
        AvoidAreaMerger { store, limit }
    }

    /// Queries the areas intersecting `bbox` and appends the polygon typed
    /// ones to `request`'s avoid polygons. Returns every matched area.
    #[instrument(skip_all, level = "debug")]
    pub async fn merge(
        &self,
        request: &mut OrsRequest,
        bbox: BoundingBox,
        portal_mode: PortalMode,
    ) -> Result<AreaFeatureCollection, GatewayError> {
        if !portal_mode.merges_avoid_areas() {
            return Ok(AreaFeatureCollection::default());
        }

        let filter = &request.portal_options().disaster_area_filter;
        let datetime = filter.datetime_filter().map_err(|error| {
            ValidationErrors::single(
                loc!["body", "portal_options", "disaster_area_filter", "datetime"],
                error.to_string(),
            )
        })?;

        let query = AreaQuery {
            bbox,
            type_id: filter.type_id,
            datetime,
            limit: self.limit,
        };

        let areas = self.store.query(&query).await?;
        let polygons = areas.polygon_rings();

        info!(
            "Merging {} of {} matched areas into the request",
            polygons.len(),
            areas.len()
        );

        request.options_mut().merge_avoid_polygons(polygons);

        Ok(areas)
    }
}

#[cfg(test)]
mod tests {
    use dap_ors::ors_api::OrsApi;
    use dap_stores::{area::AreaFeature, area_store::InMemoryAreaStore};
    use geo::{MultiPolygon, polygon};
    use serde_json::json;

    use super::*;
    use crate::request::AvoidPolygons;

    fn square(id: i64, x: f64, y: f64) -> AreaFeature {
        let geometry = MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
            (x: x, y: y),
        ]]);

        AreaFeature {
            id,
            name: format!("square {}", id),
            description: None,
            provider_id: None,
            type_id: 1,
            sub_type_id: None,
            area: 1.0,
            geometry,
            created: "2022-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    fn merger() -> AvoidAreaMerger {
        let mut multi = square(3, 0.5, 0.5);
        multi.geometry.0.extend(square(4, 3.0, 0.0).geometry.0);

        let store = InMemoryAreaStore::new(vec![square(1, 0.0, 0.0), square(2, 20.0, 20.0), multi]);
        AvoidAreaMerger::new(Arc::new(store), 100)
    }

    fn request() -> OrsRequest {
        OrsRequest::from_value(
            OrsApi::Directions,
            json!({
                "coordinates": [[0.0, 0.0], [2.0, 2.0]],
                "options": {
                    "avoid_polygons": {
                        "type": "Polygon",
                        "coordinates": [[[5, 5], [6, 5], [6, 6], [5, 5]]]
                    }
                }
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_merge_promotes_and_appends_polygons() {
        let mut request = request();
        let areas = merger()
            .merge(
                &mut request,
                BoundingBox::new(0.0, 0.0, 2.0, 2.0),
                PortalMode::AvoidAreas,
            )
            .await
            .unwrap();

        // the multi polygon area is returned but not merged
        assert_eq!(areas.len(), 2);
        match &request.options().avoid_polygons {
            Some(AvoidPolygons::MultiPolygon { coordinates }) => assert_eq!(coordinates.len(), 2),
            other => panic!("unexpected avoid polygons {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_speeds_mode_is_a_no_op() {
        let mut request = request();
        let areas = merger()
            .merge(
                &mut request,
                BoundingBox::new(0.0, 0.0, 2.0, 2.0),
                PortalMode::CustomSpeeds,
            )
            .await
            .unwrap();

        assert!(areas.is_empty());
        assert!(matches!(
            request.options().avoid_polygons,
            Some(AvoidPolygons::Polygon { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_match_leaves_request_unchanged() {
        let mut request = request();
        let before = request.clone();

        let areas = merger()
            .merge(
                &mut request,
                BoundingBox::new(-10.0, -10.0, -9.0, -9.0),
                PortalMode::AvoidAreas,
            )
            .await
            .unwrap();

        assert!(areas.is_empty());
        assert_eq!(request, before);
    }
}
