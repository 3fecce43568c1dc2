//! This library verifies [OID4VP] Authorization Responses carrying
//! [SD-JWT VCs].
//!
//! [OID4VP]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//! [SD-JWT VCs]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-sd-jwt-vc>
//!
//! # Verifier Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use openid4vp_verifier::config::{ProcessConfig, VerifierConfig};
//! use openid4vp_verifier::core::integrity::StaticKeyResolver;
//! use openid4vp_verifier::core::response::AuthorizationResponse;
//! use openid4vp_verifier::verifier::{session::MemoryStore, Verifier};
//!
//! // Setup verifier.
//! let verifier = Verifier::builder()
//!     .with_key_resolver(Arc::new(StaticKeyResolver::new(holder_jwk)))
//!     .with_session_store(Arc::new(MemoryStore::default()))
//!     .with_config(VerifierConfig {
//!         client_id: Some("https://verifier.example.com".into()),
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! // Open a session for the Authorization Request sent to the wallet.
//! let uuid = verifier
//!     .initiate(Some(state), Some(nonce), "callback-id")
//!     .await?;
//!
//! // When the wallet posts its response, verify it.
//! let response = AuthorizationResponse::from_x_www_form_urlencoded(&body)?;
//! let record = verifier
//!     .verify_response(uuid, response, ProcessConfig::default())
//!     .await?;
//! ```
//!
//! # Verification
//!
//! An [`AuthorizationResponseWrapper`] runs the following stages once, in order,
//! stopping at the first failure:
//!
//! 1. *Error check*: a response carrying `error` is reported as a holder error.
//! 2. *State check*: the response `state` must equal the request `state`.
//! 3. *Token extraction*: each `vp_token` element is decrypted if needed and
//!    split into its JWS, disclosures and Key Binding JWT.
//! 4. *Presentation integrity*: signature, validity period, issuer and audience.
//! 5. *Credential extraction*: credentials are located through the
//!    `presentation_submission`.
//! 6. *Credential integrity*: issuer signature, validity period, issuer and `vct`.
//! 7. *Selective disclosure*: every disclosure must be committed to by the issuer.
//! 8. *Holder binding*: the Key Binding JWT must be signed by the `cnf` key and
//!    bound to this verifier, this request and this presentation.
//!
//! Each run produces a [`VerificationRecord`]. Failures are reported with the
//! [`Error`] taxonomy, which tells verification rejections apart from
//! malformed input and processing failures.
//!
//! [`AuthorizationResponseWrapper`]: crate::verifier::response::AuthorizationResponseWrapper
//! [`VerificationRecord`]: crate::verifier::record::VerificationRecord

pub mod config;
pub mod core;
pub mod error;
pub mod verifier;

pub use error::Error;

#[cfg(test)]
pub(crate) mod tests;
