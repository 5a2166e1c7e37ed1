//! Data queries.
//!
//! Every query is answered with a single frame named `sk`, carrying the current
//! signing key both as fields and as custom frame metadata. This lets dashboards
//! (and older frontends which fetch the key through the query API) obtain the key
//! without a separate resource call.
use chrono::SecondsFormat;
use grafana_plugin_sdk::{backend, data, prelude::*};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    settings::secret_from_secure_json,
    signing::{Secret, SigningKeyInfo, SIGNING_KEY_REF_ID},
    SolarNetworkDatasource,
};

/// An error answering a single query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request did not target a data source instance.
    #[error("data source instance settings missing for query {ref_id}")]
    MissingInstanceSettings {
        /// The `ref_id` of the failed query.
        ref_id: String,
    },
    /// The signing key frame was invalid.
    #[error("invalid frame for query {ref_id}: {source}")]
    InvalidFrame {
        /// The underlying frame error.
        source: data::Error,
        /// The `ref_id` of the failed query.
        ref_id: String,
    },
}

impl backend::DataQueryError for QueryError {
    fn ref_id(self) -> String {
        match self {
            Self::MissingInstanceSettings { ref_id } => ref_id,
            Self::InvalidFrame { ref_id, .. } => ref_id,
        }
    }

    fn status(&self) -> backend::DataQueryStatus {
        match self {
            Self::MissingInstanceSettings { .. } => backend::DataQueryStatus::BadRequest,
            Self::InvalidFrame { .. } => backend::DataQueryStatus::Internal,
        }
    }
}

/// Build the `sk` frame describing a signing key.
///
/// The frame has a single row with a `key` and a `date` field; the same values
/// are available under `meta.custom`.
pub fn signing_key_frame(info: &SigningKeyInfo) -> data::Frame {
    let mut custom = Map::new();
    custom.insert("key".to_string(), Value::String(info.key.clone()));
    custom.insert(
        "date".to_string(),
        Value::String(info.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
    let mut meta = data::Metadata::default();
    meta.custom = Some(custom);
    [
        [info.key.clone()].into_field("key"),
        [info.date].into_field("date"),
    ]
    .into_frame(SIGNING_KEY_REF_ID)
    .with_metadata(meta)
}

impl SolarNetworkDatasource {
    fn query_response(
        &self,
        ref_id: String,
        secret: Option<&Secret>,
    ) -> Result<backend::DataResponse, QueryError> {
        let Some(secret) = secret else {
            return Err(QueryError::MissingInstanceSettings { ref_id });
        };
        let frame = signing_key_frame(&self.signing_key(secret));
        let checked = frame.check().map_err(|source| QueryError::InvalidFrame {
            source,
            ref_id: ref_id.clone(),
        })?;
        Ok(backend::DataResponse::new(ref_id, vec![checked]))
    }
}

#[backend::async_trait]
impl backend::DataService for SolarNetworkDatasource {
    type Query = Value;
    type QueryError = QueryError;
    type Stream = backend::BoxDataResponseStream<Self::QueryError>;

    async fn query_data(
        &self,
        request: backend::QueryDataRequest<Self::Query, Self>,
    ) -> Self::Stream {
        debug!(queries = request.queries.len(), "QueryData called");
        let secret = request
            .plugin_context
            .instance_settings
            .as_ref()
            .map(|settings| secret_from_secure_json(&settings.decrypted_secure_json_data));
        let responses: Vec<_> = request
            .queries
            .into_iter()
            .map(|query| self.query_response(query.ref_id, secret.as_ref()))
            .collect();
        Box::pin(futures_util::stream::iter(responses))
    }
}
