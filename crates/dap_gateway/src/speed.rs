use std::sync::Arc;

use dap_stores::speed_profiles::{SpeedProfileContent, SpeedProfileStore};
use tracing::debug;

use crate::{error::GatewayError, request::UserSpeedLimits};

pub struct SpeedProfileResolver {
    store: Arc<dyn SpeedProfileStore>,
}

impl SpeedProfileResolver {
    pub fn new(store: Arc<dyn SpeedProfileStore>) -> Self {
        SpeedProfileResolver { store }
    }

    /// Replaces a stored profile reference by its content.
    pub async fn resolve(
        &self,
        user_speed_limits: UserSpeedLimits,
    ) -> Result<SpeedProfileContent, GatewayError> {
        match user_speed_limits {
            UserSpeedLimits::Content(content) => Ok(content),
            UserSpeedLimits::Reference(id) => {
                debug!("Resolving speed profile {}", id);

                self.store
                    .get(id)
                    .await?
                    .ok_or(GatewayError::SpeedProfileNotFound(id))
            }
        }
    }
}
