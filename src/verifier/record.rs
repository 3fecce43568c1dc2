use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::{
    core::{
        credential_format::ClaimFormatDesignation,
        presentation::{VerifiableCredentialWrapper, VerifiablePresentationWrapper},
        presentation_submission::PresentationSubmission,
        sd_jwt::Disclosure,
    },
    error::Error,
};

/// Outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationResult {
    /// Every stage passed.
    Verified,
    /// Credentials were extracted but not verified.
    ExtractedOnly,
    /// The presentation did not pass verification.
    Rejected,
    /// The response could not be processed.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationMeta {
    pub result: VerificationResult,
    pub verified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The durable output of processing one Authorization Response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationRecord {
    pub sequence: u64,
    pub session_id: String,
    pub callback_id: String,
    pub verification_meta: VerificationMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_submission: Option<PresentationSubmission>,
    pub vp_results: Vec<VpResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpResult {
    pub raw_token: String,
    pub vc_results: Vec<VcResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VcResult {
    pub raw_jwt: String,
    pub format: ClaimFormatDesignation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vctm: Option<Map<String, Json>>,
    pub valid_selective_disclosures: Vec<Disclosure>,
    pub claims: Map<String, Json>,
}

impl VerificationRecord {
    pub(crate) fn new(
        header: RecordHeader,
        result: VerificationResult,
        presentation_submission: Option<PresentationSubmission>,
        presentations: &[VerifiablePresentationWrapper],
    ) -> Self {
        Self {
            sequence: header.sequence,
            session_id: header.session_id,
            callback_id: header.callback_id,
            verification_meta: VerificationMeta {
                result,
                verified_at: Utc::now(),
                error: None,
            },
            presentation_submission,
            vp_results: presentations.iter().map(VpResult::from).collect(),
        }
    }

    /// A record of a run that ended in `error`, without presentation results.
    pub fn failed(
        header: RecordHeader,
        presentation_submission: Option<PresentationSubmission>,
        error: &Error,
    ) -> Self {
        let result = if error.is_rejection() {
            VerificationResult::Rejected
        } else {
            VerificationResult::Failed
        };

        Self {
            sequence: header.sequence,
            session_id: header.session_id,
            callback_id: header.callback_id,
            verification_meta: VerificationMeta {
                result,
                verified_at: Utc::now(),
                error: Some(error.to_string()),
            },
            presentation_submission,
            vp_results: Vec::new(),
        }
    }

    pub fn result(&self) -> VerificationResult {
        self.verification_meta.result
    }
}

/// Identifiers every record carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordHeader {
    pub sequence: u64,
    pub session_id: String,
    pub callback_id: String,
}

impl From<&VerifiablePresentationWrapper> for VpResult {
    fn from(vp: &VerifiablePresentationWrapper) -> Self {
        Self {
            raw_token: vp.raw_token().to_owned(),
            vc_results: vp.credentials().iter().map(VcResult::from).collect(),
        }
    }
}

impl From<&VerifiableCredentialWrapper> for VcResult {
    fn from(vc: &VerifiableCredentialWrapper) -> Self {
        Self {
            raw_jwt: vc.raw_jwt().to_owned(),
            format: vc.format().clone(),
            jwt_typ: vc.jwt_typ().map(ToOwned::to_owned),
            vctm: vc.vctm().cloned(),
            valid_selective_disclosures: vc.valid_selective_disclosures().to_vec(),
            claims: vc.claims().clone(),
        }
    }
}
