//! Resource calls: hands signing keys out to the frontend.
use bytes::Bytes;
use grafana_plugin_sdk::backend;
use http::{header::CONTENT_TYPE, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::{
    settings::secret_from_secure_json,
    signing::{SigningKeyInfo, SIGNING_KEY_REF_ID},
    SolarNetworkDatasource,
};

/// Errors returned from resource calls.
///
/// These are sent back to Grafana as a JSON object with an `error` field.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The request did not target a data source instance.
    #[error("data source instance settings missing from request")]
    MissingInstanceSettings,
    /// The requested resource does not exist.
    #[error("resource not found: {path}")]
    NotFound {
        /// The requested path.
        path: String,
    },
    /// The response body could not be encoded.
    #[error("error encoding response: {0}")]
    Json(#[from] serde_json::Error),
    /// The response could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
}

impl backend::ErrIntoHttpResponse for ResourceError {
    fn into_http_response(self) -> Result<Response<Bytes>, Box<dyn std::error::Error>> {
        let status = match &self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Ok(Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(serde_json::to_vec(
                &serde_json::json!({"error": self.to_string()}),
            )?))?)
    }
}

fn json_response(info: &SigningKeyInfo) -> Result<Response<Bytes>, ResourceError> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(serde_json::to_vec(info)?))?)
}

#[backend::async_trait]
impl backend::ResourceService for SolarNetworkDatasource {
    type Error = ResourceError;
    type InitialResponse = Response<Bytes>;
    type Stream = backend::BoxResourceStream<Self::Error>;

    async fn call_resource(
        &self,
        r: backend::CallResourceRequest<Self>,
    ) -> Result<(Self::InitialResponse, Self::Stream), Self::Error> {
        let path = r.request.uri().path().trim_start_matches('/');
        debug!(method = %r.request.method(), path, "CallResource called");
        match path {
            SIGNING_KEY_REF_ID => {
                let instance_settings = r
                    .plugin_context
                    .instance_settings
                    .as_ref()
                    .ok_or(ResourceError::MissingInstanceSettings)?;
                let secret =
                    secret_from_secure_json(&instance_settings.decrypted_secure_json_data);
                let info = self.signing_key(&secret);
                Ok((
                    json_response(&info)?,
                    Box::pin(futures_util::stream::empty()) as Self::Stream,
                ))
            }
            _ => Err(ResourceError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}
