use std::str::FromStr;

use dap_gateway::{PathOptions, loc, validation::ValidationErrors};
use dap_ors::ors_api::{OrsApi, OrsProfile, OrsResponseType, PortalMode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RoutingPath {
    pub portal_mode: String,
    pub ors_api: String,
    pub ors_profile: String,
}

#[derive(Debug, Deserialize)]
pub struct RoutingPathWithFormat {
    pub portal_mode: String,
    pub ors_api: String,
    pub ors_profile: String,
    pub ors_response_type: String,
}

/// How the response format of a route is chosen.
#[derive(Debug, Clone, Copy)]
pub enum ResponseFormat<'a> {
    /// The default of the requested API.
    ApiDefault,
    Fixed(OrsResponseType),
    Segment(&'a str),
}

fn parse_segment<T>(name: &'static str, value: &str, errors: &mut ValidationErrors) -> Option<T>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .parse()
        .map_err(|error: T::Err| errors.push(loc!["path", name], error.to_string()))
        .ok()
}

fn parse_path(
    portal_mode: &str,
    ors_api: &str,
    ors_profile: &str,
    format: ResponseFormat,
) -> Result<PathOptions, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let portal_mode: Option<PortalMode> = parse_segment("portal_mode", portal_mode, &mut errors);
    let api: Option<OrsApi> = parse_segment("ors_api", ors_api, &mut errors);
    let profile: Option<OrsProfile> = parse_segment("ors_profile", ors_profile, &mut errors);
    let response_type: Option<OrsResponseType> = match format {
        ResponseFormat::ApiDefault => api.map(|api| api.default_response_type()),
        ResponseFormat::Fixed(response_type) => Some(response_type),
        ResponseFormat::Segment(value) => parse_segment("ors_response_type", value, &mut errors),
    };

    match (portal_mode, api, profile, response_type) {
        (Some(portal_mode), Some(api), Some(profile), Some(response_type)) => Ok(PathOptions {
            portal_mode,
            api,
            profile,
            response_type,
        }),
        _ => Err(errors),
    }
}

impl RoutingPath {
    pub fn parse(&self, format: ResponseFormat) -> Result<PathOptions, ValidationErrors> {
        parse_path(&self.portal_mode, &self.ors_api, &self.ors_profile, format)
    }
}

impl RoutingPathWithFormat {
    pub fn parse(&self) -> Result<PathOptions, ValidationErrors> {
        parse_path(
            &self.portal_mode,
            &self.ors_api,
            &self.ors_profile,
            ResponseFormat::Segment(&self.ors_response_type),
        )
    }
}

#[cfg(test)]
mod tests {
    use dap_gateway::validation::Loc;

    use super::*;

    fn path(portal_mode: &str, ors_api: &str, ors_profile: &str) -> RoutingPath {
        RoutingPath {
            portal_mode: portal_mode.to_owned(),
            ors_api: ors_api.to_owned(),
            ors_profile: ors_profile.to_owned(),
        }
    }

    #[test]
    fn test_default_response_type_depends_on_api() {
        let directions = path("avoid_areas", "directions", "driving-car")
            .parse(ResponseFormat::ApiDefault)
            .unwrap();
        let isochrones = path("avoid_areas", "isochrones", "foot-walking")
            .parse(ResponseFormat::ApiDefault)
            .unwrap();

        assert_eq!(directions.response_type, OrsResponseType::Json);
        assert_eq!(isochrones.response_type, OrsResponseType::Geojson);
        assert_eq!(isochrones.profile, OrsProfile::FootWalking);
    }

    #[test]
    fn test_every_invalid_segment_is_reported() {
        let errors = path("flying", "directions", "driving-boat")
            .parse(ResponseFormat::Segment("xml"))
            .unwrap_err();

        let locs: Vec<&Loc> = errors.errors().iter().map(|error| &error.loc[1]).collect();

        assert_eq!(
            locs,
            vec![
                &Loc::from("portal_mode"),
                &Loc::from("ors_profile"),
                &Loc::from("ors_response_type"),
            ]
        );
        assert_eq!(errors.errors()[0].msg, "'flying' is not a supported portal mode");
    }

    #[test]
    fn test_response_type_segment() {
        let path = RoutingPathWithFormat {
            portal_mode: "custom_speeds".to_owned(),
            ors_api: "directions".to_owned(),
            ors_profile: "cycling-regular".to_owned(),
            ors_response_type: "gpx".to_owned(),
        }
        .parse()
        .unwrap();

        assert_eq!(path.portal_mode, PortalMode::CustomSpeeds);
        assert_eq!(path.response_type, OrsResponseType::Gpx);
    }
}
