//! Health checks, run by Grafana when a user clicks 'Save & Test' on the data source.
use std::convert::Infallible;

use grafana_plugin_sdk::backend;
use tracing::{debug, warn};

use crate::{
    settings::{PluginSettings, SettingsError},
    SolarNetworkDatasource,
};

/// Message returned when the instance settings could not be loaded.
pub const UNABLE_TO_LOAD_SETTINGS: &str = "Unable to load settings";
/// Message returned when no token secret has been configured.
pub const API_KEY_MISSING: &str = "API key is missing";
/// Message returned when the data source is configured correctly.
pub const DATA_SOURCE_WORKING: &str = "Data source is working";

/// Check that a token secret has been configured.
///
/// - settings that failed to load report [`backend::HealthStatus::Error`]
///   with [`UNABLE_TO_LOAD_SETTINGS`]
/// - an empty secret reports [`backend::HealthStatus::Error`] with [`API_KEY_MISSING`]
/// - anything else reports [`backend::HealthStatus::Ok`] with [`DATA_SOURCE_WORKING`]
pub fn check_secret_configured(
    settings: Result<PluginSettings, SettingsError>,
) -> backend::CheckHealthResponse {
    match settings {
        Err(error) => {
            warn!(%error, "Unable to load data source settings");
            backend::CheckHealthResponse::error(UNABLE_TO_LOAD_SETTINGS.to_string())
        }
        Ok(settings) if settings.secrets.token_secret.is_empty() => {
            backend::CheckHealthResponse::error(API_KEY_MISSING.to_string())
        }
        Ok(_) => backend::CheckHealthResponse::ok(DATA_SOURCE_WORKING.to_string()),
    }
}

#[backend::async_trait]
impl backend::DiagnosticsService for SolarNetworkDatasource {
    type CheckHealthError = Infallible;

    async fn check_health(
        &self,
        request: backend::CheckHealthRequest<Self>,
    ) -> Result<backend::CheckHealthResponse, Self::CheckHealthError> {
        debug!(
            org_id = request.plugin_context.org_id,
            plugin_id = %request.plugin_context.plugin_id,
            "CheckHealth called"
        );
        let settings = request
            .plugin_context
            .instance_settings
            .as_ref()
            .ok_or(SettingsError::MissingInstanceSettings)
            .and_then(PluginSettings::load);
        Ok(check_secret_configured(settings))
    }

    type CollectMetricsError = Infallible;

    async fn collect_metrics(
        &self,
        _request: backend::CollectMetricsRequest<Self>,
    ) -> Result<backend::CollectMetricsResponse, Self::CollectMetricsError> {
        Ok(backend::CollectMetricsResponse::new(None))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn settings(secret: &str) -> Result<PluginSettings, SettingsError> {
        PluginSettings::from_json(&json!({"token": "t"}), &json!({ "secret": secret }))
    }

    #[test]
    fn ok() {
        let response = check_secret_configured(settings("abc"));
        assert_eq!(response.status, backend::HealthStatus::Ok);
        assert_eq!(response.message, DATA_SOURCE_WORKING);
    }

    #[test]
    fn empty_secret() {
        let response = check_secret_configured(settings(""));
        assert_eq!(response.status, backend::HealthStatus::Error);
        assert_eq!(response.message, API_KEY_MISSING);
    }

    #[test]
    fn absent_secret() {
        let response =
            check_secret_configured(PluginSettings::from_json(&json!({}), &json!({})));
        assert_eq!(response.status, backend::HealthStatus::Error);
        assert_eq!(response.message, API_KEY_MISSING);
    }

    #[test]
    fn load_failure() {
        let response = check_secret_configured(Err(SettingsError::MissingInstanceSettings));
        assert_eq!(response.status, backend::HealthStatus::Error);
        assert_eq!(response.message, UNABLE_TO_LOAD_SETTINGS);

        let response = check_secret_configured(PluginSettings::from_json(
            &json!("not an object"),
            &json!({"secret": "abc"}),
        ));
        assert_eq!(response.status, backend::HealthStatus::Error);
        assert_eq!(response.message, UNABLE_TO_LOAD_SETTINGS);
    }
}
