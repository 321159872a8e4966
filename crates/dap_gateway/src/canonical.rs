use serde_json::{Map, Value};

use crate::request::OrsRequest;

/// The body relayed to the backend, plus the `api_key` taken out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub body: Value,
    pub api_key: Option<String>,
}

/// Drops object members that are `null`, at any depth.
pub fn prune_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, member| !member.is_null());
            map.values_mut().for_each(prune_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(prune_nulls),
        _ => {}
    }
}

fn is_empty_avoid_polygons(value: &Value) -> bool {
    value
        .get("coordinates")
        .and_then(Value::as_array)
        .is_none_or(Vec::is_empty)
}

/// Removes `options.avoid_polygons` when `remove_any` is set or when it is
/// empty, then `options` itself when nothing is left in it.
fn strip_options(body: &mut Map<String, Value>, remove_any: bool) {
    let Some(Value::Object(options)) = body.get_mut("options") else {
        return;
    };

    if options
        .get("avoid_polygons")
        .is_some_and(|avoid_polygons| remove_any || is_empty_avoid_polygons(avoid_polygons))
    {
        options.remove("avoid_polygons");
    }

    if options.is_empty() {
        body.remove("options");
    }
}

impl CanonicalRequest {
    pub fn from_request(request: &OrsRequest) -> Result<Self, serde_json::Error> {
        let mut body = serde_json::to_value(request)?;
        prune_nulls(&mut body);

        let mut api_key = None;
        if let Value::Object(map) = &mut body {
            map.remove("portal_options");
            strip_options(map, false);

            api_key = map.remove("api_key").map(|api_key| match api_key {
                Value::String(api_key) => api_key,
                other => other.to_string(),
            });
        }

        Ok(CanonicalRequest { body, api_key })
    }

    /// The same body without any avoid polygons, used as the unconstrained
    /// call when generating a difference.
    pub fn without_avoid_polygons(&self) -> Value {
        let mut body = self.body.clone();
        if let Value::Object(map) = &mut body {
            strip_options(map, true);
        }

        body
    }

    pub fn has_avoid_polygons(&self) -> bool {
        self.body
            .get("options")
            .and_then(|options| options.get("avoid_polygons"))
            .is_some()
    }
}
