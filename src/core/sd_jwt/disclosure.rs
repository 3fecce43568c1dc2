use base64::prelude::*;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::Error;

/// A decoded object property disclosure.
///
/// See: <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-12.html#section-5.2.1>
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disclosure {
    pub salt: String,
    pub key: String,
    pub value: Json,
    #[serde(skip)]
    encoded: String,
}

impl Disclosure {
    /// Decode a disclosure from its base64url encoded `[salt, key, value]` array.
    pub fn decode(encoded: &str) -> Result<Self, Error> {
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| Error::MalformedDisclosure(format!("`{encoded}` is not base64url")))?;

        let Json::Array(elements) = serde_json::from_slice(&bytes)
            .map_err(|_| Error::MalformedDisclosure(format!("`{encoded}` is not JSON")))?
        else {
            return Err(Error::MalformedDisclosure(format!(
                "`{encoded}` is not a JSON array"
            )));
        };

        let [salt, key, value] = <[Json; 3]>::try_from(elements).map_err(|elements| {
            Error::MalformedDisclosure(format!(
                "expected 3 elements, found {}",
                elements.len()
            ))
        })?;

        match (salt, key) {
            (Json::String(salt), Json::String(key)) => Ok(Self {
                salt,
                key,
                value,
                encoded: encoded.to_owned(),
            }),
            _ => Err(Error::MalformedDisclosure(
                "salt and claim name must be strings".to_owned(),
            )),
        }
    }

    /// The disclosure as presented, which is the input of its digest.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}
