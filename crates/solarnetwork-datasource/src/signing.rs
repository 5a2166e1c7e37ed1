/*! Derivation of SNWS2 request signing keys.

SolarNetwork authenticates API requests with the SNWS2 scheme. Rather than handing
the token secret itself to the Grafana frontend, the backend derives a signing key
which is only valid for a single UTC calendar day:

```text
k1  = HMAC-SHA256(key = "SNWS2" || secret, message = YYYYMMDD)
k2  = HMAC-SHA256(key = k1, message = "snws2_request")
key = hex(k2)
```

Secrets are always hashed as their UTF-8 bytes.
*/
use std::fmt;

use chrono::prelude::*;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix prepended to the token secret to form the first round HMAC key.
pub const SECRET_PREFIX: &str = "SNWS2";

/// Format of the UTC date signed in the first round.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Message signed in the second round.
pub const HASH_DATA: &str = "snws2_request";

/// Name under which signing keys are exposed, both as a resource path and as a frame name.
pub const SIGNING_KEY_REF_ID: &str = "sk";

/// A SolarNetwork token secret.
///
/// The `Debug` and `Display` implementations never print the wrapped value,
/// so a `Secret` can be safely included in log events and error messages.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Whether the secret is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Secret {
    fn from(other: String) -> Self {
        Self(other)
    }
}

impl From<&str> for Secret {
    fn from(other: &str) -> Self {
        Self(other.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A derived signing key, along with the instant it was derived at.
///
/// Serializes to `{"key": "<hex>", "date": "<RFC3339>"}`, which is the
/// shape expected by the frontend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeyInfo {
    /// The lowercase hex encoded signing key.
    pub key: String,
    /// The instant the key was derived at.
    ///
    /// Only the UTC calendar day of this instant was used during derivation.
    pub date: DateTime<Utc>,
}

impl SigningKeyInfo {
    /// Whether the key can still be used to sign requests made at `now`.
    ///
    /// Keys expire at the end of the UTC day they were derived for.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.date.date_naive() == now.date_naive()
    }
}

/// Derive the SNWS2 signing key for `secret`, valid on the UTC day of `now`.
///
/// An empty secret still yields a key; rejecting unconfigured secrets is left
/// to the health check.
///
/// # Example
///
/// ```rust
/// use chrono::prelude::*;
/// use solarnetwork_datasource::signing::{derive_signing_key, Secret};
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
/// let info = derive_signing_key(&Secret::from("mysecret"), now);
/// assert_eq!(info.key.len(), 64);
/// assert_eq!(info.date, now);
/// ```
pub fn derive_signing_key(secret: &Secret, now: DateTime<Utc>) -> SigningKeyInfo {
    let mut secret_key = Vec::with_capacity(SECRET_PREFIX.len() + secret.expose().len());
    secret_key.extend_from_slice(SECRET_PREFIX.as_bytes());
    secret_key.extend_from_slice(secret.expose().as_bytes());

    let date = now.format(DATE_FORMAT).to_string();
    let date_key = hmac_sha256(&secret_key, date.as_bytes());
    let signing_key = hmac_sha256(&date_key, HASH_DATA.as_bytes());
    SigningKeyInfo {
        key: hex::encode(signing_key),
        date: now,
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
