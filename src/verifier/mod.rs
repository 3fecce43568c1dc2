use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::{bail, Context, Result};
use session::{Outcome, Session, SessionStore, Status};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::{ProcessConfig, VerifierConfig},
    core::{integrity::KeyResolver, response::AuthorizationResponse, token::JweDecrypter},
};

use self::{
    record::{VerificationRecord, VerificationResult},
    response::{AuthorizationResponseWrapper, VerificationContext},
};

pub mod record;
pub mod response;
pub mod session;

/// An OpenID4VP verifier, receiving Authorization Responses for the sessions
/// it initiated.
#[derive(Debug, Clone)]
pub struct Verifier {
    key_resolver: Arc<dyn KeyResolver + Send + Sync>,
    jwe_decrypter: Option<Arc<dyn JweDecrypter + Send + Sync>>,
    session_store: Arc<dyn SessionStore + Send + Sync>,
    config: Arc<VerifierConfig>,
    sequence: Arc<AtomicU64>,
}

impl Verifier {
    /// Build a new verifier.
    pub fn builder() -> VerifierBuilder {
        VerifierBuilder::default()
    }

    /// Start a session for an Authorization Request carrying `state` and `nonce`.
    ///
    /// ## Returns
    /// The session identifier the response must be submitted under.
    pub async fn initiate(
        &self,
        state: Option<String>,
        nonce: Option<String>,
        callback_id: impl Into<String>,
    ) -> Result<Uuid> {
        let session = Session::new(state, nonce, callback_id);
        let uuid = session.uuid;
        self.session_store
            .initiate(session)
            .await
            .context("failed to store session")?;
        Ok(uuid)
    }

    /// Retrieve the current status of a session.
    pub async fn poll_status(&self, uuid: Uuid) -> Result<Status> {
        self.session_store
            .get_session(uuid)
            .await
            .map(|session| session.status)
    }

    /// Verify an Authorization Response.
    ///
    /// Verification outcomes, including rejections, are stored on the session
    /// and returned as a [VerificationRecord]; only session store errors and
    /// responses to unknown or already answered sessions are returned as errors.
    pub async fn verify_response(
        &self,
        uuid: Uuid,
        authorization_response: AuthorizationResponse,
        process_config: ProcessConfig,
    ) -> Result<VerificationRecord> {
        let session = self
            .session_store
            .begin_response(uuid)
            .await
            .context("session cannot accept a response")?;

        let context = VerificationContext {
            session_id: uuid.to_string(),
            callback_id: session.callback_id,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            expected_state: session.state,
            nonce: session.nonce,
            key_resolver: self.key_resolver.clone(),
            jwe_decrypter: self.jwe_decrypter.clone(),
            config: self.config.clone(),
        };
        let header = context.record_header();
        let submission = authorization_response.presentation_submission().cloned();

        let mut wrapper =
            AuthorizationResponseWrapper::new(authorization_response, context, process_config);
        let (record, outcome) = match wrapper.process().await {
            Ok(record) => {
                let outcome = match record.result() {
                    VerificationResult::Verified => Outcome::Success,
                    _ => Outcome::Failure {
                        reason: "credentials were extracted without verification".to_owned(),
                    },
                };
                (record, outcome)
            }
            Err(e) => (
                VerificationRecord::failed(header, submission, &e),
                Outcome::from(e),
            ),
        };

        info!(%uuid, result = ?record.result(), "authorization response processed");

        self.session_store
            .update_status(uuid, Status::Complete(outcome))
            .await
            .context("failed to update session status")?;

        Ok(record)
    }
}

/// Builder struct for [Verifier].
#[derive(Debug, Clone, Default)]
pub struct VerifierBuilder {
    key_resolver: Option<Arc<dyn KeyResolver + Send + Sync>>,
    jwe_decrypter: Option<Arc<dyn JweDecrypter + Send + Sync>>,
    session_store: Option<Arc<dyn SessionStore + Send + Sync>>,
    config: VerifierConfig,
}

impl VerifierBuilder {
    /// Build the verifier.
    pub fn build(self) -> Result<Verifier> {
        let Self {
            key_resolver,
            jwe_decrypter,
            session_store,
            config,
        } = self;

        let Some(key_resolver) = key_resolver else {
            bail!("key resolver is required, see `with_key_resolver`")
        };

        let Some(session_store) = session_store else {
            bail!("session store is required, see `with_session_store`")
        };

        Ok(Verifier {
            key_resolver,
            jwe_decrypter,
            session_store,
            config: Arc::new(config),
            sequence: Arc::default(),
        })
    }

    /// Set the [KeyResolver] that presentations and credentials are verified with.
    pub fn with_key_resolver(mut self, key_resolver: Arc<dyn KeyResolver + Send + Sync>) -> Self {
        self.key_resolver = Some(key_resolver);
        self
    }

    /// Set the [JweDecrypter] for encrypted `vp_token` elements.
    pub fn with_jwe_decrypter(mut self, jwe_decrypter: Arc<dyn JweDecrypter + Send + Sync>) -> Self {
        self.jwe_decrypter = Some(jwe_decrypter);
        self
    }

    /// Set the [SessionStore] that the [Verifier] will use to maintain session state across
    /// transactions.
    pub fn with_session_store(
        mut self,
        session_store: Arc<dyn SessionStore + Send + Sync>,
    ) -> Self {
        self.session_store = Some(session_store);
        self
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }
}
