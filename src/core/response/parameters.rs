use crate::core::object::TypedParameter;

use anyhow::{bail, Error};
use serde_json::{Map, Value as Json};

pub use crate::core::presentation_submission::PresentationSubmission;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdToken(pub String);

impl TypedParameter for IdToken {
    const KEY: &'static str = "id_token";
}

impl TryFrom<Json> for IdToken {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map(Self).map_err(Into::into)
    }
}

impl From<IdToken> for Json {
    fn from(value: IdToken) -> Self {
        value.0.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State(pub String);

impl TypedParameter for State {
    const KEY: &'static str = "state";
}

impl TryFrom<Json> for State {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<State> for Json {
    fn from(value: State) -> Self {
        Json::String(value.0)
    }
}

/// The `error` code of an error response.
///
/// See: [RFC6749#section-4.1.2.1](https://www.rfc-editor.org/rfc/rfc6749#section-4.1.2.1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError(pub String);

impl TypedParameter for ResponseError {
    const KEY: &'static str = "error";
}

impl TryFrom<Json> for ResponseError {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ResponseError> for Json {
    fn from(value: ResponseError) -> Self {
        Json::String(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription(pub String);

impl TypedParameter for ErrorDescription {
    const KEY: &'static str = "error_description";
}

impl TryFrom<Json> for ErrorDescription {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ErrorDescription> for Json {
    fn from(value: ErrorDescription) -> Self {
        Json::String(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorUri(pub String);

impl TypedParameter for ErrorUri {
    const KEY: &'static str = "error_uri";
}

impl TryFrom<Json> for ErrorUri {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        Ok(Self(serde_json::from_value(value)?))
    }
}

impl From<ErrorUri> for Json {
    fn from(value: ErrorUri) -> Self {
        Json::String(value.0)
    }
}

/// A single Verifiable Presentation of the `vp_token` parameter.
///
/// > Each Verifiable Presentation MUST be represented as a JSON string (that is a Base64url encoded value)
/// > or a JSON object depending on a format as defined in Appendix A of [OpenID.VCI].
///
/// See: [OpenID.VP#section-6.1-2.2](https://openid.net/specs/openid-4-verifiable-presentations-1_0.html#section-6.1-2.2)
#[derive(Debug, Clone, PartialEq)]
pub enum VpToken {
    /// String-based presentation (JWT, SD-JWT or JWE compact serialization).
    Jwt(String),
    /// Object-based presentation (e.g. a JSON-LD Verifiable Presentation).
    Json(Map<String, Json>),
}

impl VpToken {
    pub fn as_jwt(&self) -> Option<&str> {
        match self {
            Self::Jwt(s) => Some(s),
            Self::Json(_) => None,
        }
    }
}

impl TryFrom<Json> for VpToken {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        match value {
            Json::String(s) => Ok(Self::Jwt(s)),
            Json::Object(map) => Ok(Self::Json(map)),
            other => bail!("invalid vp_token element: expected a string or an object, found {other}"),
        }
    }
}

impl From<VpToken> for Json {
    fn from(value: VpToken) -> Self {
        match value {
            VpToken::Jwt(s) => Json::String(s),
            VpToken::Json(map) => Json::Object(map),
        }
    }
}

/// OpenID Connect for Verifiable Presentations specification defines `vp_token` parameter:
///
/// > JSON String or JSON object that MUST contain a single Verifiable Presentation or
/// > an array of JSON Strings and JSON objects each of them containing a Verifiable Presentations.
///
/// A single presentation is normalized to a list of one.
#[derive(Debug, Clone, PartialEq)]
pub struct VpTokens(pub Vec<VpToken>);

impl VpTokens {
    pub fn iter(&self) -> std::slice::Iter<'_, VpToken> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl TypedParameter for VpTokens {
    const KEY: &'static str = "vp_token";
}

impl TryFrom<Json> for VpTokens {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        match value {
            Json::Array(arr) => arr
                .into_iter()
                .map(VpToken::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            value => VpToken::try_from(value).map(|token| Self(vec![token])),
        }
    }
}

impl From<VpTokens> for Json {
    fn from(value: VpTokens) -> Self {
        match <[VpToken; 1]>::try_from(value.0) {
            Ok([token]) => token.into(),
            Err(tokens) => Json::Array(tokens.into_iter().map(Json::from).collect()),
        }
    }
}

impl<'a> IntoIterator for &'a VpTokens {
    type Item = &'a VpToken;
    type IntoIter = std::slice::Iter<'a, VpToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn vp_token_single_string() {
        let tokens = VpTokens::try_from(json!("eyJ.eyJ.sig~")).unwrap();
        assert_eq!(tokens.0, vec![VpToken::Jwt("eyJ.eyJ.sig~".into())]);
        assert_eq!(Json::from(tokens), json!("eyJ.eyJ.sig~"));
    }

    #[test]
    fn vp_token_mixed_array() {
        let tokens = VpTokens::try_from(json!(["a.b.c", {"type": "VerifiablePresentation"}])).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.0[0].as_jwt(), Some("a.b.c"));
        assert!(matches!(&tokens.0[1], VpToken::Json(map) if map.contains_key("type")));
    }

    #[test]
    fn vp_token_rejects_other_elements() {
        assert!(VpTokens::try_from(json!(42)).is_err());
        assert!(VpTokens::try_from(json!(["a.b.c", null])).is_err());
    }
}
