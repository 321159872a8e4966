use std::sync::Arc;

use dap_ors::{
    client::{OrsClient, OrsResponse},
    headers::{JSON_CONTENT_TYPE, OrsHeaders},
    ors_api::{OrsApi, OrsEndpoint, OrsProfile, OrsResponseType, PortalMode},
};
use dap_stores::{
    area_store::{AreaStore, DEFAULT_AREA_QUERY_LIMIT},
    speed_profiles::SpeedProfileStore,
};
use fxhash::FxHashMap;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    canonical::CanonicalRequest,
    difference::generate_difference,
    error::GatewayError,
    loc,
    lookup_box::compute_lookup_box,
    merger::AvoidAreaMerger,
    request::{OrsRequest, UserSpeedLimits},
    response::{Augmentation, assemble, augment, result_items},
    speed::SpeedProfileResolver,
    validation::ValidationErrors,
};

/// Target of a request, taken from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOptions {
    pub portal_mode: PortalMode,
    pub api: OrsApi,
    pub profile: OrsProfile,
    pub response_type: OrsResponseType,
}

impl PathOptions {
    pub fn endpoint(&self) -> OrsEndpoint {
        OrsEndpoint {
            api: self.api,
            profile: self.profile,
            response_type: self.response_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl GatewayResponse {
    fn ok(body: String, response_type: OrsResponseType, content_type: Option<String>) -> Self {
        GatewayResponse {
            status: 200,
            body,
            content_type: content_type.unwrap_or_else(|| response_type.accept().to_owned()),
        }
    }

    fn passthrough(response: OrsResponse, response_type: OrsResponseType) -> Self {
        GatewayResponse {
            status: response.status,
            body: response.body,
            content_type: response
                .content_type
                .unwrap_or_else(|| response_type.accept().to_owned()),
        }
    }
}

pub struct GatewayParams {
    /// Alternative backend base urls by name.
    pub ors_servers: FxHashMap<String, String>,
    pub area_query_limit: usize,
}

impl Default for GatewayParams {
    fn default() -> Self {
        GatewayParams {
            ors_servers: FxHashMap::default(),
            area_query_limit: DEFAULT_AREA_QUERY_LIMIT,
        }
    }
}

/// Augments routing requests with stored avoid areas and speed profiles and
/// relays them to the backend.
pub struct Gateway {
    client: OrsClient,
    merger: AvoidAreaMerger,
    resolver: SpeedProfileResolver,
    ors_servers: FxHashMap<String, String>,
}

impl Gateway {
    pub fn new(
        client: OrsClient,
        area_store: Arc<dyn AreaStore>,
        speed_profile_store: Arc<dyn SpeedProfileStore>,
        params: GatewayParams,
    ) -> Self {
        Gateway {
            client,
            merger: AvoidAreaMerger::new(area_store, params.area_query_limit),
            resolver: SpeedProfileResolver::new(speed_profile_store),
            ors_servers: params.ors_servers,
        }
    }

    fn resolve_server(&self, name: Option<&str>) -> Result<Option<&str>, ValidationErrors> {
        let Some(name) = name else {
            return Ok(None);
        };

        self.ors_servers
            .get(name)
            .map(|url| Some(url.as_str()))
            .ok_or_else(|| {
                ValidationErrors::single(
                    loc!["body", "portal_options", "ors_server"],
                    format!("Unknown ORS server '{}'", name),
                )
            })
    }

    #[instrument(skip_all, level = "debug")]
    async fn resolve_speed_limits(&self, request: &mut OrsRequest) -> Result<(), GatewayError> {
        let common = request.common_mut();

        if let Some(user_speed_limits) = common.user_speed_limits.take() {
            let content = self.resolver.resolve(user_speed_limits).await?;
            common.user_speed_limits = Some(UserSpeedLimits::Content(content));
        }

        Ok(())
    }

    /// Runs the whole pipeline for one request. Non-2xx backend answers are
    /// returned as they are.
    #[instrument(skip_all, fields(api = %path.api, profile = %path.profile, format = %path.response_type))]
    pub async fn handle(
        &self,
        mut request: OrsRequest,
        path: &PathOptions,
        caller_authorization: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        if !path.api.supports(path.response_type) {
            return Err(ValidationErrors::single(
                loc!["path", "ors_response_type"],
                format!(
                    "The {} API does not support the {} response type",
                    path.api, path.response_type
                ),
            )
            .into());
        }

        let base_url = self.resolve_server(request.portal_options().ors_server.as_deref())?;
        let lookup_bbox = compute_lookup_box(&request, path.api, path.profile)?;

        let areas = self
            .merger
            .merge(&mut request, lookup_bbox, path.portal_mode)
            .await?;

        self.resolve_speed_limits(&mut request).await?;

        let canonical = CanonicalRequest::from_request(&request)?;
        let headers = OrsHeaders::new(
            path.response_type,
            canonical.api_key.clone(),
            caller_authorization,
        );

        let portal_options = request.portal_options();
        if portal_options.debug {
            info!("Debug mode, returning the prepared request");
            return Ok(GatewayResponse {
                status: 200,
                body: serde_json::to_string(&canonical.body)?,
                content_type: JSON_CONTENT_TYPE.to_owned(),
            });
        }

        let endpoint = path.endpoint();
        let augmentation = Augmentation {
            portal_options,
            areas: &areas,
            lookup_bbox,
            difference: None,
        };

        let wants_difference = portal_options.generate_difference
            && canonical.has_avoid_polygons()
            && path.response_type != OrsResponseType::Gpx;

        if !wants_difference {
            let response = self
                .client
                .relay(base_url, &endpoint, &headers, &canonical.body)
                .await?;

            if !response.is_success() {
                return Ok(GatewayResponse::passthrough(response, path.response_type));
            }

            let body = assemble(response.body, path.response_type, augmentation)?;
            return Ok(GatewayResponse::ok(
                body,
                path.response_type,
                response.content_type,
            ));
        }

        let unconstrained = canonical.without_avoid_polygons();
        let (avoid_response, base_response) = tokio::try_join!(
            self.client
                .relay(base_url, &endpoint, &headers, &canonical.body),
            self.client
                .relay(base_url, &endpoint, &headers, &unconstrained),
        )?;

        for response in [&avoid_response, &base_response] {
            if !response.is_success() {
                return Ok(GatewayResponse::passthrough(
                    response.clone(),
                    path.response_type,
                ));
            }
        }

        let avoid_body: Value = serde_json::from_str(&avoid_response.body)?;
        let base_body: Value = serde_json::from_str(&base_response.body)?;

        let difference = generate_difference(
            path.api,
            path.response_type,
            request.attributes(),
            result_items(&avoid_body, path.response_type),
            result_items(&base_body, path.response_type),
        );

        info!(
            "Generated a difference of {} features",
            difference.features.len()
        );

        let body = augment(
            avoid_body,
            path.response_type,
            Augmentation {
                difference: Some(difference),
                ..augmentation
            },
        )?;

        Ok(GatewayResponse::ok(
            serde_json::to_string(&body)?,
            path.response_type,
            avoid_response.content_type,
        ))
    }
}
