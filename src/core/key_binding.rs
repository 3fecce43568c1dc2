//! Holder binding: the Key Binding JWT appended to a presented SD-JWT.
//!
//! See: <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-12.html#section-4.3>
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::{
    config::{ValidationOptions, VerifierConfig},
    core::{
        integrity::{check_audience, check_issued_at, Clock, KeyResolver},
        sd_jwt::{sd_alg, SdAlg},
        token::DecomposedToken,
    },
    error::{Error, Reason, Step},
};

/// Required `typ` of a Key Binding JWT.
pub const KB_JWT_TYP: &str = "kb+jwt";

const STEP: Step = Step::HolderBinding;

/// Session values the Key Binding JWT is checked against.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindingExpectations<'a> {
    pub client_id: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub clock: Clock,
}

impl<'a> KeyBindingExpectations<'a> {
    pub fn new(config: &'a VerifierConfig, nonce: Option<&'a str>, clock: Clock) -> Self {
        Self {
            client_id: config.client_id.as_deref(),
            nonce,
            clock,
        }
    }
}

/// Verifies the Key Binding JWT of a credential, if any.
///
/// Checks, in order: signature against the credential's bound key, `iat`,
/// `aud`, `nonce` and `sd_hash`.
pub async fn verify_key_binding(
    credential: &DecomposedToken,
    expectations: KeyBindingExpectations<'_>,
    options: &ValidationOptions,
    resolver: &(dyn KeyResolver + Send + Sync),
) -> Result<(), Error> {
    let Some(kb_jwt) = credential.key_binding() else {
        if options.require_holder_binding {
            return Err(reject(Reason::MissingHolderBinding));
        }
        debug!("no key binding JWT presented");
        return Ok(());
    };

    let kb = DecomposedToken::from_jws(kb_jwt).map_err(|e| e.at(STEP))?;

    if let Some(typ) = kb.typ() {
        if typ != KB_JWT_TYP {
            return Err(reject(Reason::MalformedClaim {
                claim: "typ".to_owned(),
            }));
        }
    }

    if !options.skip_vc_signature_checks {
        let key = resolver
            .cnf_key(credential)
            .await
            .map_err(|e| Error::failed(STEP, e.context("unable to resolve holder binding key")))?;
        key.verify_jws(&kb).map_err(|e| Error::failed(STEP, e))?;
    }

    let claims = kb.payload();
    check_issued_at(claims, expectations.clock).map_err(reject)?;

    if !options.skip_audience_check {
        if let Some(client_id) = expectations.client_id {
            if !claims.contains_key("aud") {
                return Err(reject(Reason::AudienceMismatch {
                    expected: client_id.to_owned(),
                    found: Json::Null.to_string(),
                }));
            }
            check_audience(claims, Some(client_id)).map_err(reject)?;
        }
    }

    if !options.skip_nonce_check {
        if let Some(nonce) = expectations.nonce {
            if claims.get("nonce").and_then(Json::as_str) != Some(nonce) {
                return Err(reject(Reason::NonceMismatch));
            }
        }
    }

    match claims.get("sd_hash") {
        None => (),
        Some(Json::String(sd_hash)) => {
            let alg = sd_alg(credential.payload())?.unwrap_or(SdAlg::DEFAULT);
            if alg.hash(credential.sd_jwt_without_key_binding().as_bytes()) != *sd_hash {
                return Err(reject(Reason::SdHashMismatch));
            }
        }
        Some(_) => {
            return Err(reject(Reason::MalformedClaim {
                claim: "sd_hash".to_owned(),
            }))
        }
    }

    debug!("holder binding verified");
    Ok(())
}

fn reject(reason: Reason) -> Error {
    warn!(step = %STEP, "rejected: {reason}");
    Error::rejected(STEP, reason)
}
