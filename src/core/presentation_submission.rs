use super::{credential_format::ClaimFormatDesignation, object::TypedParameter};
use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A DescriptorMapId is a unique identifier for a DescriptorMap.
pub type DescriptorMapId = String;

/// JSONPath expression designating the whole `vp_token` element.
pub const ROOT_PATH: &str = "$";

/// Presentation Submissions are objects embedded within target
/// [Claim](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:claim) negotiation
/// formats that express how the inputs presented as proofs to a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) are
/// provided in accordance with the requirements of the presentation request.
///
/// The `id` is kept as a string: wallets are not consistent about sending a UUID.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    id: String,
    definition_id: String,
    descriptor_map: Vec<DescriptorMap>,
}

impl TypedParameter for PresentationSubmission {
    const KEY: &'static str = "presentation_submission";
}

impl TryFrom<Json> for PresentationSubmission {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        // Form-encoded responses carry the submission as a JSON string.
        match value {
            Json::String(s) => serde_json::from_str(&s).map_err(Into::into),
            value => serde_json::from_value(value).map_err(Into::into),
        }
    }
}

impl From<PresentationSubmission> for Json {
    fn from(value: PresentationSubmission) -> Self {
        serde_json::json!({
            "id": value.id,
            "definition_id": value.definition_id,
            "descriptor_map": value
                .descriptor_map
                .into_iter()
                .map(Json::from)
                .collect::<Vec<_>>(),
        })
    }
}

impl PresentationSubmission {
    /// The presentation submission MUST contain an `id` and a `definition_id`
    /// property, and a `descriptor_map` array of [DescriptorMap] objects.
    pub fn new(
        id: impl Into<String>,
        definition_id: impl Into<String>,
        descriptor_map: Vec<DescriptorMap>,
    ) -> Self {
        Self {
            id: id.into(),
            definition_id: definition_id.into(),
            descriptor_map,
        }
    }

    /// Return the id of the presentation submission.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the definition id of the presentation submission.
    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }

    /// Return the descriptor map of the presentation submission.
    pub fn descriptor_map(&self) -> &[DescriptorMap] {
        &self.descriptor_map
    }
}

/// Descriptor Maps are objects used to describe the information a
/// [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder) provides
/// to a [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier).
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    pub id: DescriptorMapId,
    pub format: ClaimFormatDesignation,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_nested: Option<Box<DescriptorMap>>,
}

impl DescriptorMap {
    /// The descriptor map MUST include an `id`, a `format` ([ClaimFormatDesignation])
    /// and a `path` property. The `path` is a [JSONPath](https://goessner.net/articles/JsonPath/)
    /// expression evaluated against the top-level of the object the
    /// [PresentationSubmission] is embedded within.
    pub fn new(
        id: impl Into<DescriptorMapId>,
        format: impl Into<ClaimFormatDesignation>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path: path.into(),
            path_nested: None,
        }
    }

    /// Set the nested path of the descriptor map.
    ///
    /// The `id` property MUST be the same for each level of nesting.
    pub fn set_path_nested(mut self, mut path_nested: DescriptorMap) -> Self {
        path_nested.id.clone_from(&self.id);

        self.path_nested = Some(Box::new(path_nested));

        self
    }

    /// Returns `true` if the descriptor designates the whole `vp_token` element.
    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }
}

impl From<DescriptorMap> for Json {
    fn from(value: DescriptorMap) -> Self {
        // Serializing a plain struct of strings cannot fail.
        serde_json::to_value(value).unwrap_or_default()
    }
}
