//! Presentations and the credentials extracted from them through the
//! presentation submission.
use base64::prelude::*;
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::{
    core::{
        credential_format::ClaimFormatDesignation,
        presentation_submission::PresentationSubmission,
        sd_jwt::Disclosure,
        token::{DecomposedToken, TokenError},
    },
    error::{Error, Step},
};

/// A decomposed `vp_token` element and the credentials it carries.
#[derive(Debug, Clone)]
pub struct VerifiablePresentationWrapper {
    token: DecomposedToken,
    credentials: Vec<VerifiableCredentialWrapper>,
}

impl VerifiablePresentationWrapper {
    pub fn new(token: DecomposedToken) -> Self {
        Self {
            token,
            credentials: Vec::new(),
        }
    }

    /// The presented token, or its plaintext if it was encrypted.
    pub fn raw_token(&self) -> &str {
        self.token.raw()
    }

    pub fn was_decrypted(&self) -> bool {
        self.token.was_decrypted()
    }

    pub fn token(&self) -> &DecomposedToken {
        &self.token
    }

    pub fn credentials(&self) -> &[VerifiableCredentialWrapper] {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut [VerifiableCredentialWrapper] {
        &mut self.credentials
    }

    /// Extract the embedded credentials designated by `submission`.
    pub fn extract_credentials(&mut self, submission: &PresentationSubmission) -> Result<(), Error> {
        self.credentials = extract_credentials(&self.token, submission)?;
        Ok(())
    }
}

/// A decomposed credential and the disclosures that passed validation.
#[derive(Debug, Clone)]
pub struct VerifiableCredentialWrapper {
    format: ClaimFormatDesignation,
    token: DecomposedToken,
    vctm: Option<Map<String, Json>>,
    valid_disclosures: Vec<Disclosure>,
}

impl VerifiableCredentialWrapper {
    pub fn new(format: ClaimFormatDesignation, token: DecomposedToken) -> Result<Self, Error> {
        let vctm = decode_vctm(token.header())?;
        Ok(Self {
            format,
            token,
            vctm,
            valid_disclosures: Vec::new(),
        })
    }

    pub fn format(&self) -> &ClaimFormatDesignation {
        &self.format
    }

    pub fn raw_jwt(&self) -> &str {
        self.token.raw()
    }

    pub fn token(&self) -> &DecomposedToken {
        &self.token
    }

    /// `typ` header, e.g. `vc+sd-jwt`.
    pub fn jwt_typ(&self) -> Option<&str> {
        self.token.typ()
    }

    /// Decoded type metadata document from the `vctm` header.
    pub fn vctm(&self) -> Option<&Map<String, Json>> {
        self.vctm.as_ref()
    }

    pub fn claims(&self) -> &Map<String, Json> {
        self.token.payload()
    }

    /// The Key Binding JWT, empty when none was presented.
    pub fn holder_binding_jwt(&self) -> &str {
        self.token.key_binding().unwrap_or_default()
    }

    pub fn valid_selective_disclosures(&self) -> &[Disclosure] {
        &self.valid_disclosures
    }

    pub(crate) fn set_valid_selective_disclosures(&mut self, disclosures: Vec<Disclosure>) {
        self.valid_disclosures = disclosures;
    }
}

/// Locate the credentials embedded in a presentation.
///
/// Only a single descriptor pointing at the whole `vp_token` element (`$`)
/// with the `vc+sd-jwt` format is supported: the presentation token itself is
/// the SD-JWT VC.
pub fn extract_credentials(
    presentation: &DecomposedToken,
    submission: &PresentationSubmission,
) -> Result<Vec<VerifiableCredentialWrapper>, Error> {
    let [descriptor] = submission.descriptor_map() else {
        return Err(Error::Unsupported(format!(
            "a descriptor map with {} entries",
            submission.descriptor_map().len()
        )));
    };

    if descriptor.path_nested.is_some() {
        return Err(Error::Unsupported("path_nested".to_owned()));
    }
    if !descriptor.is_root() {
        return Err(Error::Unsupported(format!(
            "descriptor path `{}`",
            descriptor.path
        )));
    }
    if descriptor.format != ClaimFormatDesignation::VcSdJwt {
        return Err(Error::Unsupported(format!(
            "credential format `{}`",
            descriptor.format
        )));
    }

    debug!(descriptor = %descriptor.id, "extracting credential");
    let token = DecomposedToken::from_jws(presentation.raw()).map_err(|e| e.at(Step::VcExtraction))?;
    Ok(vec![VerifiableCredentialWrapper::new(
        descriptor.format.clone(),
        token,
    )?])
}

fn decode_vctm(header: &Map<String, Json>) -> Result<Option<Map<String, Json>>, Error> {
    const PART: &str = "vctm";

    let Some(Json::Array(entries)) = header.get("vctm") else {
        return Ok(None);
    };
    let encoded = match entries.as_slice() {
        [] => return Ok(None),
        [Json::String(encoded)] => encoded,
        [_] => return Err(TokenError::InvalidBase64 { part: PART }.into()),
        _ => return Err(Error::Unsupported("more than one vctm entry".to_owned())),
    };

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|_| TokenError::InvalidBase64 { part: PART })?;
    match serde_json::from_slice(&bytes).map_err(|_| TokenError::InvalidJson { part: PART })? {
        Json::Object(vctm) => Ok(Some(vctm)),
        _ => Err(TokenError::NotAnObject { part: PART }.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        core::presentation_submission::DescriptorMap,
        tests::{issue_sd_jwt, sign_jws},
    };

    fn submission(descriptors: Vec<DescriptorMap>) -> PresentationSubmission {
        PresentationSubmission::new("s1", "pid", descriptors)
    }

    fn presentation() -> DecomposedToken {
        DecomposedToken::from_jws(&issue_sd_jwt(json!({"vct": "pid"}), &[])).unwrap()
    }

    #[test]
    fn root_sd_jwt_vc() {
        let mut vp = VerifiablePresentationWrapper::new(presentation());
        vp.extract_credentials(&submission(vec![DescriptorMap::new("d1", "vc+sd-jwt", "$")]))
            .unwrap();

        let [vc] = vp.credentials() else {
            panic!("expected one credential")
        };
        assert_eq!(vc.raw_jwt(), vp.raw_token());
        assert_eq!(vc.format(), &ClaimFormatDesignation::VcSdJwt);
        assert_eq!(vc.jwt_typ(), Some("vc+sd-jwt"));
        assert_eq!(vc.claims()["vct"], "pid");
        assert_eq!(vc.holder_binding_jwt(), "");
        assert!(vc.valid_selective_disclosures().is_empty());
        assert!(vc.vctm().is_none());
    }

    #[test]
    fn form_decoded_format() {
        let credentials = extract_credentials(
            &presentation(),
            &submission(vec![DescriptorMap::new("d1", "vc sd-jwt", "$")]),
        )
        .unwrap();
        assert_eq!(credentials.len(), 1);
    }

    #[test]
    fn unsupported_topologies() {
        let cases = [
            vec![],
            vec![
                DescriptorMap::new("d1", "vc+sd-jwt", "$"),
                DescriptorMap::new("d2", "vc+sd-jwt", "$"),
            ],
            vec![DescriptorMap::new("d1", "vc+sd-jwt", "$")
                .set_path_nested(DescriptorMap::new("d1", "vc+sd-jwt", "$"))],
            vec![DescriptorMap::new("d1", "vc+sd-jwt", "$.verifiableCredential[0]")],
            vec![DescriptorMap::new("d1", "ldp_vc", "$")],
            vec![DescriptorMap::new("d1", "mso_mdoc", "$")],
        ];

        for descriptors in cases {
            let err = extract_credentials(&presentation(), &submission(descriptors)).unwrap_err();
            assert!(matches!(err, Error::Unsupported(_)), "{err}");
        }
    }

    #[test]
    fn vctm_header() {
        let vctm = json!({"vct": "pid", "name": "Person Identification Data"});
        let encoded = BASE64_URL_SAFE.encode(vctm.to_string());
        let token = sign_jws(
            json!({"alg": "ES256", "typ": "vc+sd-jwt", "vctm": [encoded]}),
            json!({"vct": "pid"}),
        );

        let vc = VerifiableCredentialWrapper::new(
            ClaimFormatDesignation::VcSdJwt,
            DecomposedToken::from_jws(&token).unwrap(),
        )
        .unwrap();
        assert_eq!(vc.vctm().unwrap()["name"], "Person Identification Data");
    }

    #[test]
    fn multiple_vctm_entries() {
        let token = sign_jws(
            json!({"alg": "ES256", "vctm": ["e30", "e30"]}),
            json!({}),
        );
        let err = VerifiableCredentialWrapper::new(
            ClaimFormatDesignation::VcSdJwt,
            DecomposedToken::from_jws(&token).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
