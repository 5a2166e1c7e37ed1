//! Typed view of a SolarNetwork data source instance's configuration.
use grafana_plugin_sdk::backend::DataSourceInstanceSettings;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::signing::Secret;

/// Key of the token secret within the decrypted secure JSON data.
pub const SECRET_KEY: &str = "secret";

/// Errors occurring when loading [`PluginSettings`].
///
/// None of these errors include secure JSON values in their messages.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// The request did not target a data source instance.
    #[error("data source instance settings missing from request")]
    MissingInstanceSettings,
    /// The instance's JSON data did not have the expected shape.
    #[error("unexpected plugin JSON data: {err}")]
    JsonData {
        /// The underlying JSON error.
        err: serde_json::Error,
    },
    /// The instance's decrypted secure JSON data did not have the expected shape.
    #[error(
        "unexpected plugin secure JSON data (got keys: [{keys}])",
        keys = secure_json_keys.join(", ")
    )]
    SecureJsonData {
        /// The keys found in the decrypted secure JSON data.
        secure_json_keys: Vec<String>,
    },
}

/// Settings for a SolarNetwork data source instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PluginSettings {
    /// The SolarNetwork security token ID.
    #[serde(default)]
    pub token: String,
    /// Base URL of the SolarNetwork API, if not the public one.
    #[serde(default)]
    pub host: Option<String>,
    /// URL prefix of a proxy in front of the SolarNetwork API.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Settings stored in Grafana's encrypted secure JSON data.
    #[serde(skip)]
    pub secrets: SecretPluginSettings,
}

/// The secure part of [`PluginSettings`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SecretPluginSettings {
    /// The SolarNetwork security token secret.
    #[serde(rename = "secret", default)]
    pub token_secret: Secret,
}

impl PluginSettings {
    /// Load the settings of a data source instance.
    pub fn load(
        instance_settings: &DataSourceInstanceSettings<Value, Value>,
    ) -> Result<Self, SettingsError> {
        Self::from_json(
            &instance_settings.json_data,
            &instance_settings.decrypted_secure_json_data,
        )
    }

    /// Load settings from raw JSON data and decrypted secure JSON data.
    ///
    /// A `null` document is treated as an empty object, since Grafana omits
    /// JSON data that has never been saved.
    pub fn from_json(json_data: &Value, secure_json_data: &Value) -> Result<Self, SettingsError> {
        let mut settings = match json_data {
            Value::Null => Self::default(),
            other => {
                Self::deserialize(other).map_err(|err| SettingsError::JsonData { err })?
            }
        };
        settings.secrets = match secure_json_data {
            Value::Null => SecretPluginSettings::default(),
            other => SecretPluginSettings::deserialize(other).map_err(|_| {
                SettingsError::SecureJsonData {
                    secure_json_keys: other
                        .as_object()
                        .map(|o| o.keys().cloned().collect())
                        .unwrap_or_default(),
                }
            })?,
        };
        Ok(settings)
    }
}

/// Read the token secret from decrypted secure JSON data.
///
/// Unlike [`PluginSettings::from_json`] this never fails: a missing or
/// non-string entry is read as an empty secret.
pub fn secret_from_secure_json(secure_json_data: &Value) -> Secret {
    secure_json_data
        .get(SECRET_KEY)
        .and_then(Value::as_str)
        .map(Secret::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn full() {
        let settings = PluginSettings::from_json(
            &json!({
                "token": "abc123",
                "host": "https://data.solarnetwork.net",
                "proxy": "/api/datasources/proxy/1",
            }),
            &json!({"secret": "shh"}),
        )
        .unwrap();
        assert_eq!(settings.token, "abc123");
        assert_eq!(settings.host.as_deref(), Some("https://data.solarnetwork.net"));
        assert_eq!(settings.proxy.as_deref(), Some("/api/datasources/proxy/1"));
        assert_eq!(settings.secrets.token_secret, Secret::from("shh"));
    }

    #[test]
    fn empty() {
        let settings = PluginSettings::from_json(&json!({}), &json!({})).unwrap();
        assert_eq!(settings, PluginSettings::default());
        assert!(settings.secrets.token_secret.is_empty());

        let settings = PluginSettings::from_json(&Value::Null, &Value::Null).unwrap();
        assert_eq!(settings, PluginSettings::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let settings =
            PluginSettings::from_json(&json!({"other": 1}), &json!({"apiKey": "x"})).unwrap();
        assert!(settings.secrets.token_secret.is_empty());
    }

    #[test]
    fn invalid_json_data() {
        let err = PluginSettings::from_json(&json!({"token": 5}), &json!({})).unwrap_err();
        assert!(matches!(err, SettingsError::JsonData { .. }));
    }

    #[test]
    fn invalid_secure_json_data_hides_values() {
        let err =
            PluginSettings::from_json(&json!({}), &json!({"secret": ["hunter2"]})).unwrap_err();
        assert!(matches!(err, SettingsError::SecureJsonData { .. }));
        let msg = err.to_string();
        assert!(msg.contains("secret"));
        assert!(!msg.contains("hunter2"));
    }

    #[test]
    fn debug_hides_secret() {
        let settings =
            PluginSettings::from_json(&json!({}), &json!({"secret": "hunter2"})).unwrap();
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[test]
    fn secret_lookup() {
        assert_eq!(
            secret_from_secure_json(&json!({"secret": "shh"})),
            Secret::from("shh")
        );
        assert!(secret_from_secure_json(&json!({})).is_empty());
        assert!(secret_from_secure_json(&json!({"secret": 1})).is_empty());
        assert!(secret_from_secure_json(&Value::Null).is_empty());
    }
}
