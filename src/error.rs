use std::fmt;

use serde::Serialize;

/// Stage of the verification pipeline an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Holder-signaled `error` parameter.
    ErrorCheck,
    /// Comparison of the `state` parameter with the session.
    StateCheck,
    /// Presence of `presentation_submission`.
    SubmissionCheck,
    /// Decomposition of every `vp_token` element.
    TokenExtraction,
    /// Signature and registered claims of every presentation.
    VpIntegrity,
    /// Extraction of embedded credentials via the descriptor map.
    VcExtraction,
    /// Signature and registered claims of every credential.
    VcIntegrity,
    /// Disclosure digests against the issuer's `_sd` commitments.
    SelectiveDisclosure,
    /// Key Binding JWT of every credential.
    HolderBinding,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::ErrorCheck => "error check",
            Self::StateCheck => "state check",
            Self::SubmissionCheck => "submission check",
            Self::TokenExtraction => "token extraction",
            Self::VpIntegrity => "vp integrity",
            Self::VcExtraction => "vc extraction",
            Self::VcIntegrity => "vc integrity",
            Self::SelectiveDisclosure => "selective disclosure",
            Self::HolderBinding => "holder binding",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Why presented material was judged untrustworthy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reason {
    #[error("state mismatch: expected `{expected}`, got {found:?}")]
    StateMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token has an `iat` value in the future")]
    IssuedInFuture,

    #[error("issuer mismatch: expected `{expected}`, got `{found}`")]
    IssuerMismatch { expected: String, found: String },

    #[error("audience mismatch: expected `{expected}`, got {found}")]
    AudienceMismatch { expected: String, found: String },

    #[error("vct mismatch: expected `{expected}`, got `{found}`")]
    VctMismatch { expected: String, found: String },

    #[error("nonce mismatch")]
    NonceMismatch,

    #[error("missing holder binding proof")]
    MissingHolderBinding,

    #[error("`sd_hash` does not match the presented SD-JWT")]
    SdHashMismatch,

    #[error("disclosure of `{claim}` does not match any issuer commitment")]
    UndisclosedCommitment { claim: String },

    #[error("disclosure of `{claim}` was presented more than once")]
    DuplicateDisclosure { claim: String },

    #[error("claim `{claim}` has an unexpected type")]
    MalformedClaim { claim: String },
}

/// Business rejection: the verifier worked, the presentation did not pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("verification rejected at {step}: {reason}")]
pub struct VerificationRejectedError {
    pub step: Step,
    pub reason: Reason,
}

impl VerificationRejectedError {
    pub fn new(step: Step, reason: Reason) -> Self {
        Self { step, reason }
    }
}

/// Technical failure raised by a collaborator (signature library, key
/// resolution, decryption).
#[derive(Debug, thiserror::Error)]
#[error("verification failed at {step}: {source}")]
pub struct VerificationFailedError {
    pub step: Step,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl VerificationFailedError {
    pub fn new(step: Step, source: impl Into<anyhow::Error>) -> Self {
        Self {
            step,
            source: source.into().into(),
        }
    }
}

/// Verification error.
///
/// Variants other than [`Error::Rejected`] and [`Error::Failed`] are
/// structural or configuration errors: the input is malformed or outside the
/// supported topology, and retrying cannot help.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The holder answered with an error response.
    #[error("error received from holder: {error}")]
    Holder {
        error: String,
        description: Option<String>,
        uri: Option<String>,
    },

    /// The response wrapper was asked to process a second time.
    #[error("authorization response has already been processed")]
    AlreadyProcessed,

    #[error("no presentation_submission found in response")]
    MissingPresentationSubmission,

    #[error("no vp_token found in response")]
    MissingVpToken,

    /// A token could not be decomposed.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] crate::core::token::TokenError),

    /// Valid input outside the topology this verifier handles.
    #[error("{0} is not yet supported")]
    Unsupported(String),

    #[error("malformed disclosure: {0}")]
    MalformedDisclosure(String),

    #[error("`_sd_alg` not found in credential")]
    MissingSdAlg,

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedSdAlg(String),

    #[error("claims are nested deeper than {0} levels")]
    ClaimNestingTooDeep(usize),

    #[error(transparent)]
    Rejected(#[from] VerificationRejectedError),

    #[error(transparent)]
    Failed(#[from] VerificationFailedError),
}

impl Error {
    pub(crate) fn rejected(step: Step, reason: Reason) -> Self {
        Self::Rejected(VerificationRejectedError::new(step, reason))
    }

    pub(crate) fn failed(step: Step, source: impl Into<anyhow::Error>) -> Self {
        Self::Failed(VerificationFailedError::new(step, source))
    }

    /// Returns `true` if this error is a business rejection rather than a
    /// structural or technical error.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The pipeline step recorded on rejections and failures.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Rejected(e) => Some(e.step),
            Self::Failed(e) => Some(e.step),
            _ => None,
        }
    }

    /// The rejection reason, if this is a rejection.
    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Self::Rejected(e) => Some(&e.reason),
            _ => None,
        }
    }
}
