use std::sync::Arc;

use anyhow::Context;
use dap_gateway::{Gateway, GatewayParams};
use dap_ors::client::{OrsClient, OrsClientParams};
use dap_stores::{
    area_store::{AreaStore, InMemoryAreaStore},
    speed_profiles::{InMemorySpeedProfileStore, SpeedProfileStore},
};
use tracing::info;

use crate::config::Config;

pub struct AppState {
    pub gateway: Gateway,
}

impl AppState {
    /// Loads the stores named in the configuration and builds the gateway.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let area_store = match &config.areas_file {
            Some(path) => InMemoryAreaStore::from_geojson_file(path)
                .with_context(|| format!("Could not load areas from {}", path.display()))?,
            None => InMemoryAreaStore::new(Vec::new()),
        };
        info!("Loaded {} avoid areas", area_store.len());

        let speed_profile_store = match &config.speed_profiles_file {
            Some(path) => InMemorySpeedProfileStore::from_json_file(path).with_context(|| {
                format!("Could not load speed profiles from {}", path.display())
            })?,
            None => InMemorySpeedProfileStore::new(Vec::new()),
        };
        info!("Loaded {} speed profiles", speed_profile_store.len());

        let client = OrsClient::new(OrsClientParams {
            base_url: config.ors_backend_url.clone(),
            timeout: config.ors_timeout,
        })
        .context("Could not build the backend client")?;

        Ok(Self::new(
            client,
            Arc::new(area_store),
            Arc::new(speed_profile_store),
            config,
        ))
    }

    pub fn new(
        client: OrsClient,
        area_store: Arc<dyn AreaStore>,
        speed_profile_store: Arc<dyn SpeedProfileStore>,
        config: &Config,
    ) -> Self {
        let params = GatewayParams {
            ors_servers: config.ors_servers.clone(),
            area_query_limit: config.area_query_limit,
        };

        AppState {
            gateway: Gateway::new(client, area_store, speed_profile_store, params),
        }
    }
}
