//! Single-pass verification of an Authorization Response.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::{ProcessConfig, ProcessType, VerifierConfig},
    core::{
        integrity::{Clock, IntegrityVerifier, KeyResolver},
        key_binding::{verify_key_binding, KeyBindingExpectations},
        presentation::VerifiablePresentationWrapper,
        response::{parameters::VpToken, AuthorizationResponse},
        sd_jwt::validate_disclosures,
        token::{JweDecrypter, TokenDecomposer},
    },
    error::{Error, Reason, Step},
};

use super::record::{RecordHeader, VerificationRecord, VerificationResult};

/// Session and trust material a response is verified against.
#[derive(Debug, Clone)]
pub struct VerificationContext {
    pub session_id: String,
    pub callback_id: String,
    /// Sequence number of the emitted record.
    pub sequence: u64,
    /// `state` of the Authorization Request.
    pub expected_state: Option<String>,
    /// `nonce` of the Authorization Request.
    pub nonce: Option<String>,
    pub key_resolver: Arc<dyn KeyResolver + Send + Sync>,
    pub jwe_decrypter: Option<Arc<dyn JweDecrypter + Send + Sync>>,
    pub config: Arc<VerifierConfig>,
}

impl VerificationContext {
    pub fn new(key_resolver: Arc<dyn KeyResolver + Send + Sync>) -> Self {
        Self {
            session_id: String::new(),
            callback_id: String::new(),
            sequence: 0,
            expected_state: None,
            nonce: None,
            key_resolver,
            jwe_decrypter: None,
            config: Arc::default(),
        }
    }

    pub fn record_header(&self) -> RecordHeader {
        RecordHeader {
            sequence: self.sequence,
            session_id: self.session_id.clone(),
            callback_id: self.callback_id.clone(),
        }
    }
}

/// Progress of [AuthorizationResponseWrapper::process].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Init,
    ErrorChecked,
    StateChecked,
    SubmissionPresent,
    TokensExtracted,
    VpsIntegrityChecked,
    VcsExtracted,
    /// Terminal state of [ProcessType::ExtractOnly].
    ExtractedOnly,
    VcsIntegrityChecked,
    SelectiveDisclosuresChecked,
    HolderBindingChecked,
    Done,
}

/// Verifies one Authorization Response, exactly once.
#[derive(Debug)]
pub struct AuthorizationResponseWrapper {
    response: AuthorizationResponse,
    context: VerificationContext,
    process_config: ProcessConfig,
    state: ProcessState,
    processed: bool,
    presentations: Vec<VerifiablePresentationWrapper>,
}

impl AuthorizationResponseWrapper {
    pub fn new(
        response: AuthorizationResponse,
        context: VerificationContext,
        process_config: ProcessConfig,
    ) -> Self {
        Self {
            response,
            context,
            process_config,
            state: ProcessState::Init,
            processed: false,
            presentations: Vec::new(),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn response(&self) -> &AuthorizationResponse {
        &self.response
    }

    pub fn presentations(&self) -> &[VerifiablePresentationWrapper] {
        &self.presentations
    }

    /// Run the verification pipeline.
    ///
    /// The first failing stage aborts the run. A second call fails with
    /// [Error::AlreadyProcessed] without running any stage.
    pub async fn process(&mut self) -> Result<VerificationRecord, Error> {
        if self.processed {
            return Err(Error::AlreadyProcessed);
        }
        self.processed = true;

        let clock = Clock::system(self.context.config.clock_skew);
        let options = self.process_config.options;

        info!(session = %self.context.session_id, "processing authorization response");

        self.check_error()?;
        self.advance(ProcessState::ErrorChecked);

        if options.skip_state_check {
            debug!("state check skipped");
        } else {
            self.check_state()?;
        }
        self.advance(ProcessState::StateChecked);

        if self.response.presentation_submission().is_none() {
            return Err(Error::MissingPresentationSubmission);
        }
        self.advance(ProcessState::SubmissionPresent);

        self.extract_tokens().await?;
        self.advance(ProcessState::TokensExtracted);

        if options.skip_vp_signature_checks {
            debug!("presentation integrity checks skipped");
        } else {
            let verifier = IntegrityVerifier::new(&self.context.config, clock).with_options(&options);
            for vp in &self.presentations {
                verifier
                    .verify_presentation(vp.token(), self.context.key_resolver.as_ref())
                    .await?;
            }
        }
        self.advance(ProcessState::VpsIntegrityChecked);

        self.extract_credentials()?;
        self.advance(ProcessState::VcsExtracted);

        if self.process_config.process_type == ProcessType::ExtractOnly {
            self.advance(ProcessState::ExtractedOnly);
            warn!("credentials extracted without verification");
            return Ok(self.record(VerificationResult::ExtractedOnly));
        }

        if options.skip_vc_signature_checks {
            debug!("credential integrity checks skipped");
        } else {
            let verifier = IntegrityVerifier::new(&self.context.config, clock).with_options(&options);
            for vc in self.presentations.iter().flat_map(|vp| vp.credentials()) {
                verifier
                    .verify_credential(vc.token(), self.context.key_resolver.as_ref())
                    .await?;
            }
        }
        self.advance(ProcessState::VcsIntegrityChecked);

        let max_depth = self.context.config.max_claim_depth;
        for vc in self
            .presentations
            .iter_mut()
            .flat_map(|vp| vp.credentials_mut().iter_mut())
        {
            let valid = validate_disclosures(vc.token(), max_depth)?;
            vc.set_valid_selective_disclosures(valid);
        }
        self.advance(ProcessState::SelectiveDisclosuresChecked);

        let expectations =
            KeyBindingExpectations::new(&self.context.config, self.context.nonce.as_deref(), clock);
        for vc in self.presentations.iter().flat_map(|vp| vp.credentials()) {
            verify_key_binding(
                vc.token(),
                expectations,
                &options,
                self.context.key_resolver.as_ref(),
            )
            .await?;
        }
        self.advance(ProcessState::HolderBindingChecked);

        let record = self.record(VerificationResult::Verified);
        self.advance(ProcessState::Done);
        info!(session = %self.context.session_id, "authorization response verified");
        Ok(record)
    }

    fn advance(&mut self, state: ProcessState) {
        debug!(from = ?self.state, to = ?state, "stage complete");
        self.state = state;
    }

    fn check_error(&self) -> Result<(), Error> {
        let Some(error) = self.response.error() else {
            return Ok(());
        };
        warn!(error = %error.0, "holder returned an error response");
        Err(Error::Holder {
            error: error.0.clone(),
            description: self.response.error_description().map(|d| d.0.clone()),
            uri: self.response.error_uri().map(|u| u.0.clone()),
        })
    }

    fn check_state(&self) -> Result<(), Error> {
        let found = self.response.state().map(|s| s.0.as_str());
        let expected = self.context.expected_state.as_deref();
        if found == expected {
            return Ok(());
        }
        warn!(?expected, ?found, "state mismatch");
        Err(Error::rejected(
            Step::StateCheck,
            Reason::StateMismatch {
                expected: expected.unwrap_or_default().to_owned(),
                found: found.map(ToOwned::to_owned),
            },
        ))
    }

    async fn extract_tokens(&mut self) -> Result<(), Error> {
        let tokens = match self.response.vp_token() {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => return Err(Error::MissingVpToken),
        };

        let decomposer = TokenDecomposer::new(
            self.context.jwe_decrypter.clone(),
            self.context.config.max_jwe_nesting,
        );

        let mut presentations = Vec::with_capacity(tokens.len());
        for token in tokens {
            let raw = match token {
                VpToken::Jwt(raw) => raw,
                VpToken::Json(_) => {
                    return Err(Error::Unsupported("object-based vp_token".to_owned()))
                }
            };
            let decomposed = decomposer
                .decompose(raw)
                .await
                .map_err(|e| e.at(Step::TokenExtraction))?;
            presentations.push(VerifiablePresentationWrapper::new(decomposed));
        }

        debug!(count = presentations.len(), "presentations decomposed");
        self.presentations = presentations;
        Ok(())
    }

    fn extract_credentials(&mut self) -> Result<(), Error> {
        let Some(submission) = self.response.presentation_submission() else {
            return Err(Error::MissingPresentationSubmission);
        };
        for vp in &mut self.presentations {
            vp.extract_credentials(submission)?;
        }
        Ok(())
    }

    fn record(&self, result: VerificationResult) -> VerificationRecord {
        VerificationRecord::new(
            self.context.record_header(),
            result,
            self.response.presentation_submission().cloned(),
            &self.presentations,
        )
    }
}
