use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use dap_api::{app::app, config::Config, state::AppState};
use dap_ors::client::{OrsClient, OrsClientParams};
use dap_stores::{
    area::{AreaFeature, geodesic_area},
    area_store::InMemoryAreaStore,
    speed_profiles::{InMemorySpeedProfileStore, SpeedProfileContent},
};
use geo::{LineString, MultiPolygon, Polygon};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn area_store() -> InMemoryAreaStore {
    let ring = vec![
        (8.683, 49.4212),
        (8.6871, 49.4214),
        (8.6871, 49.4182),
        (8.682, 49.4181),
        (8.683, 49.4212),
    ];
    let geometry = MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])]);

    InMemoryAreaStore::new(vec![AreaFeature {
        id: 7,
        name: "flooded bridge".to_owned(),
        description: Some("closed until further notice".to_owned()),
        provider_id: Some(1),
        type_id: 1,
        sub_type_id: None,
        area: geodesic_area(&geometry),
        geometry,
        created: "2022-05-01T10:00:00Z".parse().unwrap(),
    }])
}

fn speed_profile_store() -> InMemorySpeedProfileStore {
    InMemorySpeedProfileStore::new([(
        1,
        SpeedProfileContent {
            unit: "kmh".to_owned(),
            road_speeds: Some(BTreeMap::from([("primary".to_owned(), 30)])),
            surface_speeds: None,
        },
    )])
}

fn router_with(base_url: String, config: Config) -> Router {
    let client = OrsClient::new(OrsClientParams {
        base_url,
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let state = AppState::new(
        client,
        Arc::new(area_store()),
        Arc::new(speed_profile_store()),
        &config,
    );

    app(Arc::new(state), &config)
}

fn router(server: &MockServer) -> Router {
    router_with(server.uri(), Config::default())
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String, Option<String>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_owned());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("ORS-Authorization", "caller key")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn directions_body() -> Value {
    json!({
        "coordinates": [[8.678613, 49.411721], [8.687782, 49.424597]],
        "portal_options": { "return_areas_in_response": true }
    })
}

fn directions_response() -> Value {
    json!({
        "bbox": [8.678613, 49.411721, 8.687782, 49.424597],
        "routes": [{ "summary": { "distance": 2100.0, "duration": 300.0 } }],
        "metadata": { "service": "routing" }
    })
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;

    let (status, body, _) = send(router(&server), get("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_post_relays_directions_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/directions/driving-car/json"))
        .and(header("Authorization", "caller key"))
        .and(body_partial_json(json!({
            "options": { "avoid_polygons": { "type": "MultiPolygon" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(directions_response()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body, content_type) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/directions/driving-car",
            directions_body(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/json"));

    let body = json_body(&body);
    assert_eq!(body["routes"][0]["summary"]["distance"], 2100.0);
    assert_eq!(body["disaster_areas"]["features"][0]["id"], 7);
    assert_eq!(
        body["metadata"]["portal_options"]["return_areas_in_response"],
        true
    );
}

#[tokio::test]
async fn test_post_isochrones_default_to_geojson() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isochrones/foot-walking/geojson"))
        .and(header("Accept", "application/geo+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "FeatureCollection",
            "features": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/isochrones/foot-walking",
            json!({ "locations": [[8.681495, 49.41461]], "range": [300] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["type"], "FeatureCollection");
}

#[tokio::test]
async fn test_post_with_response_type_segment() {
    let server = MockServer::start().await;
    let gpx = r#"<?xml version="1.0" encoding="UTF-8"?><gpx version="1.0"></gpx>"#;
    Mock::given(method("POST"))
        .and(path("/directions/cycling-regular/gpx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(gpx, "application/gpx+xml;charset=UTF-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (status, body, content_type) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/directions/cycling-regular/gpx",
            directions_body(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, gpx);
    assert!(content_type.unwrap().starts_with("application/gpx+xml"));
}

#[tokio::test]
async fn test_isochrones_reject_json() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/isochrones/driving-car/json",
            json!({ "locations": [[8.681495, 49.41461]], "range": [300] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(&body)["detail"][0]["loc"],
        json!(["path", "ors_response_type"])
    );
}

#[tokio::test]
async fn test_invalid_path_segments() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/flying/directions/driving-car",
            directions_body(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(&body);
    assert_eq!(body["detail"][0]["loc"], json!(["path", "portal_mode"]));
    assert_eq!(
        body["detail"][0]["msg"],
        "'flying' is not a supported portal mode"
    );
}

#[tokio::test]
async fn test_invalid_body() {
    let server = MockServer::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/routing/avoid_areas/directions/driving-car")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body, _) = send(router(&server), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(&body)["detail"][0]["loc"], json!(["body"]));
}

#[tokio::test]
async fn test_single_coordinate_is_rejected() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/directions/driving-car",
            json!({ "coordinates": [[8.678613, 49.411721]] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(&body)["detail"][0]["loc"][1],
        "coordinates"
    );
}

#[tokio::test]
async fn test_unknown_speed_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/custom_speeds/directions/driving-car",
            json!({
                "coordinates": [[8.678613, 49.411721], [8.687782, 49.424597]],
                "user_speed_limits": 99
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({ "code": 6404, "message": "Custom speeds with id '99' do not exist" })
    );
}

#[tokio::test]
async fn test_get_relays_geojson_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/directions/driving-car/geojson"))
        .and(header("Authorization", "some key"))
        .and(body_partial_json(json!({
            "coordinates": [[8.678613, 49.411721], [8.687782, 49.424597]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "FeatureCollection",
            "features": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body, _) = send(
        router(&server),
        get("/api/v1/routing/avoid_areas/directions/driving-car?api_key=some%20key&start=8.678613,49.411721&end=8.687782,49.424597"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["type"], "FeatureCollection");
}

#[tokio::test]
async fn test_get_debug_returns_prepared_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body, _) = send(
        router(&server),
        get("/api/v1/routing/avoid_areas/directions/driving-car?api_key=some%20key&start=8.678613,49.411721&end=8.687782,49.424597&debug=1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(
        body["coordinates"],
        json!([[8.678613, 49.411721], [8.687782, 49.424597]])
    );
    assert!(body.get("portal_options").is_none());
    assert_eq!(body["options"]["avoid_polygons"]["type"], "MultiPolygon");
}

#[tokio::test]
async fn test_get_missing_start() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        get("/api/v1/routing/avoid_areas/directions/driving-car?end=8.687782,49.424597"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body)["detail"],
        "Start coordinates parameter missing"
    );
}

#[tokio::test]
async fn test_get_invalid_end() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        get("/api/v1/routing/avoid_areas/directions/driving-car?start=8.678613,49.411721&end=8.687782,1.1.1.1"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body)["detail"],
        "End coordinates parameter invalid"
    );
}

#[tokio::test]
async fn test_get_isochrones_is_rejected() {
    let server = MockServer::start().await;

    let (status, body, _) = send(
        router(&server),
        get("/api/v1/routing/avoid_areas/isochrones/driving-car?start=8.678613,49.411721&end=8.687782,49.424597"),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(&body)["detail"][0]["loc"],
        json!(["path", "ors_api"])
    );
}

#[tokio::test]
async fn test_backend_errors_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "Access to this API has been disallowed" })))
        .mount(&server)
        .await;

    let (status, body, _) = send(
        router(&server),
        post(
            "/api/v1/routing/avoid_areas/directions/driving-car",
            directions_body(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(&body)["error"],
        "Access to this API has been disallowed"
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_a_bad_gateway() {
    let (status, _, _) = send(
        router_with("http://127.0.0.1:1".to_owned(), Config::default()),
        post(
            "/api/v1/routing/avoid_areas/directions/driving-car",
            directions_body(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_custom_prefix() {
    let server = MockServer::start().await;
    let config = Config {
        api_prefix: "/dap".to_owned(),
        ..Config::default()
    };

    let (status, _, _) = send(router_with(server.uri(), config.clone()), get("/dap/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(router_with(server.uri(), config), get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight() {
    let server = MockServer::start().await;
    let config = Config {
        cors_origins: dap_api::config::CorsOrigins::Any,
        ..Config::default()
    };

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/routing/avoid_areas/directions/driving-car")
        .header("Origin", "https://portal.example.org")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = router_with(server.uri(), config)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
