use dap_ors::ors_api::OrsResponseType;
use dap_stores::{area::AreaFeatureCollection, bbox::BoundingBox};
use serde_json::{Map, Value};

use crate::{difference::Difference, error::GatewayError, request::PortalOptions};

/// What is added to a successful backend response.
pub struct Augmentation<'a> {
    pub portal_options: &'a PortalOptions,
    pub areas: &'a AreaFeatureCollection,
    pub lookup_bbox: BoundingBox,
    pub difference: Option<Difference>,
}

/// Result list of a backend response, empty when there is none.
pub fn result_items(body: &Value, response_type: OrsResponseType) -> &[Value] {
    body.get(response_type.result_key())
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Adds matched areas, the difference and the echoed portal options to a
/// parsed backend response.
pub fn augment(
    mut body: Value,
    response_type: OrsResponseType,
    augmentation: Augmentation,
) -> Result<Value, GatewayError> {
    let Value::Object(map) = &mut body else {
        return Ok(body);
    };

    if augmentation.portal_options.return_areas_in_response && !augmentation.areas.is_empty() {
        map.insert(
            "disaster_areas".to_owned(),
            serde_json::to_value(augmentation.areas.to_geojson())?,
        );
        map.insert(
            "disaster_areas_lookup_bbox".to_owned(),
            serde_json::to_value(augmentation.lookup_bbox)?,
        );
    }

    if let Some(difference) = augmentation.difference {
        map.insert(
            response_type.result_key().to_owned(),
            Value::Array(difference.features),
        );

        match difference.bbox {
            Some(bbox) => {
                map.insert("bbox".to_owned(), serde_json::to_value(bbox)?);
            }
            None => {
                map.remove("bbox");
            }
        }
    }

    let metadata = map
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(metadata) = metadata {
        metadata.insert(
            "portal_options".to_owned(),
            serde_json::to_value(augmentation.portal_options)?,
        );
    }

    Ok(body)
}

/// Final body for a successful backend response. GPX is passed on untouched.
pub fn assemble(
    raw: String,
    response_type: OrsResponseType,
    augmentation: Augmentation,
) -> Result<String, GatewayError> {
    if response_type == OrsResponseType::Gpx {
        return Ok(raw);
    }

    let body: Value = serde_json::from_str(&raw)?;
    let body = augment(body, response_type, augmentation)?;

    Ok(serde_json::to_string(&body)?)
}
