use anyhow::{Context, Error};
use serde_json::{Map, Value as Json};

use self::parameters::{
    ErrorDescription, ErrorUri, IdToken, PresentationSubmission, ResponseError, State, VpTokens,
};

use super::object::{OptionalParameter, UntypedObject};

pub mod parameters;

/// Parameters carried as JSON text inside a form-encoded `direct_post` body.
const JSON_IN_FORM: [&str; 2] = ["vp_token", "presentation_submission"];

/// An Authorization Response submitted by a holder.
///
/// Every parameter is optional at this level; the verifier decides which
/// ones are required and in which order their absence is reported. Present
/// but malformed parameters fail construction.
#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    raw: UntypedObject,
    id_token: Option<IdToken>,
    vp_token: Option<VpTokens>,
    presentation_submission: Option<PresentationSubmission>,
    state: Option<State>,
    error: Option<ResponseError>,
    error_description: Option<ErrorDescription>,
    error_uri: Option<ErrorUri>,
}

impl AuthorizationResponse {
    /// Decode an `application/x-www-form-urlencoded` response body.
    ///
    /// `vp_token` and `presentation_submission` are parsed as JSON when they
    /// hold JSON text, a bare compact token is kept as a string.
    pub fn from_x_www_form_urlencoded(bytes: &[u8]) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(bytes).context("invalid form-encoded response")?;

        let mut map = Map::new();
        for (key, value) in pairs {
            let value = if JSON_IN_FORM.contains(&key.as_str()) {
                serde_json::from_str(&value).unwrap_or(Json::String(value))
            } else {
                Json::String(value)
            };
            map.insert(key, value);
        }

        UntypedObject::from(map).try_into()
    }

    pub fn id_token(&self) -> Option<&IdToken> {
        self.id_token.as_ref()
    }

    pub fn vp_token(&self) -> Option<&VpTokens> {
        self.vp_token.as_ref()
    }

    pub fn presentation_submission(&self) -> Option<&PresentationSubmission> {
        self.presentation_submission.as_ref()
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    /// The holder-signaled error code, ignoring empty values.
    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref().filter(|e| !e.0.is_empty())
    }

    pub fn error_description(&self) -> Option<&ErrorDescription> {
        self.error_description.as_ref()
    }

    pub fn error_uri(&self) -> Option<&ErrorUri> {
        self.error_uri.as_ref()
    }

    pub fn serializable(self) -> UntypedObject {
        self.raw
    }
}

impl TryFrom<UntypedObject> for AuthorizationResponse {
    type Error = Error;

    fn try_from(value: UntypedObject) -> Result<Self, Self::Error> {
        Ok(Self {
            id_token: value.get().optional()?,
            vp_token: value.get().optional()?,
            presentation_submission: value.get().optional()?,
            state: value.get().optional()?,
            error: value.get().optional()?,
            error_description: value.get().optional()?,
            error_uri: value.get().optional()?,
            raw: value,
        })
    }
}

impl TryFrom<Json> for AuthorizationResponse {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        let Json::Object(map) = value else {
            anyhow::bail!("authorization response must be a JSON object")
        };
        UntypedObject::from(map).try_into()
    }
}
