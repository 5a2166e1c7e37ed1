/*! A Grafana backend data source plugin for [SolarNetwork].

SolarNetwork signs API requests using the SNWS2 scheme, which requires a key derived
from the security token's secret. The secret is stored in the data source's encrypted
secure JSON data, so only this backend ever sees it; the frontend instead asks the
backend for a signing key valid for the current UTC day.

The plugin exposes three services:

- a resource service, which returns the current signing key as JSON from the `sk`
  resource (see [`signing::SigningKeyInfo`])
- a data service, which answers every query with a frame describing the current
  signing key (see [`signing_key_frame`])
- a diagnostics service, whose health check verifies that a secret has been configured
  (see [`health::check_secret_configured`])

Logs are emitted with [`tracing`] and formatted for Grafana by the SDK's subscriber,
filtered using the `RUST_LOG` environment variable.

[SolarNetwork]: https://solarnetwork.github.io/
*/
#![deny(missing_docs)]

use chrono::prelude::*;
use grafana_plugin_sdk::prelude::*;
use tracing::warn;

pub mod health;
mod query;
mod resource;
pub mod settings;
pub mod signing;

pub use query::{signing_key_frame, QueryError};
pub use resource::ResourceError;

use signing::{derive_signing_key, Secret, SigningKeyInfo};

/// The SolarNetwork data source plugin.
///
/// The plugin holds no state other than the clock used to timestamp
/// signing keys, so cloning it is cheap.
#[derive(Clone, Debug, GrafanaPlugin)]
#[grafana_plugin(plugin_type = "datasource")]
pub struct SolarNetworkDatasource {
    now: fn() -> DateTime<Utc>,
}

impl SolarNetworkDatasource {
    /// Create a plugin using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Create a plugin which reads the current time from `now`.
    pub fn with_clock(now: fn() -> DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Derive the signing key for `secret` valid at the current time.
    pub fn signing_key(&self, secret: &Secret) -> SigningKeyInfo {
        if secret.is_empty() {
            warn!("Deriving signing key from an empty secret; configure the token secret");
        }
        derive_signing_key(secret, (self.now)())
    }
}

impl Default for SolarNetworkDatasource {
    fn default() -> Self {
        Self::new()
    }
}
