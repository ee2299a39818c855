use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::EndpointError;

/// A named management endpoint; serde is confined to this module tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub(crate) name: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) parameters: HashMap<String, String>,
}

impl Endpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL of the resource manager, e.g. `https://management.azure.com/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Request timeout from the `timeout_secs` parameter, if configured.
    pub fn timeout(&self) -> Result<Option<Duration>, EndpointError> {
        self.parameter("timeout_secs")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| EndpointError::InvalidParameter {
                        endpoint: self.name.clone(),
                        key: "timeout_secs".to_string(),
                        value: raw.to_string(),
                    })
            })
            .transpose()
    }
}
