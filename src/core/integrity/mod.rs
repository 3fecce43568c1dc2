//! Signature and registered claim checks of presentations and credentials.
//!
//! Checks run in a fixed order and stop at the first failure: signature,
//! `exp`, `nbf`, `iat`, then `iss` and `aud` for presentations or `iss` and
//! `vct` for credentials. Claim checks only apply to claims present in the
//! token, and expectation checks only when an expectation is configured.
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::{
    config::{ValidationOptions, VerifierConfig},
    core::token::DecomposedToken,
    error::{Error, Reason, Step},
};

pub use self::key::{KeyResolver, PublicKey, StaticKeyResolver};

mod key;

/// Reference time of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    /// Seconds since the Unix epoch.
    pub now: i64,
    /// Leeway in seconds.
    pub skew: i64,
}

impl Clock {
    pub fn system(skew: i64) -> Self {
        Self {
            now: chrono::Utc::now().timestamp(),
            skew,
        }
    }
}

/// Verifies presentations and credentials against the verifier's expectations.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityVerifier<'a> {
    config: &'a VerifierConfig,
    clock: Clock,
    skip_audience_check: bool,
}

impl<'a> IntegrityVerifier<'a> {
    pub fn new(config: &'a VerifierConfig, clock: Clock) -> Self {
        Self {
            config,
            clock,
            skip_audience_check: false,
        }
    }

    pub fn with_options(mut self, options: &ValidationOptions) -> Self {
        self.skip_audience_check = options.skip_audience_check;
        self
    }

    /// Verify a holder-signed presentation.
    pub async fn verify_presentation(
        &self,
        presentation: &DecomposedToken,
        resolver: &(dyn KeyResolver + Send + Sync),
    ) -> Result<(), Error> {
        let step = Step::VpIntegrity;
        let key = resolver
            .holder_key(presentation)
            .await
            .map_err(|e| Error::failed(step, e.context("unable to resolve holder key")))?;
        key.verify_jws(presentation)
            .map_err(|e| Error::failed(step, e))?;

        let payload = presentation.payload();
        self.check_claims(payload)
            .and_then(|()| check_issuer(payload, self.config.expected_vp_issuer.as_deref()))
            .and_then(|()| {
                if self.skip_audience_check {
                    return Ok(());
                }
                check_audience(payload, self.config.client_id.as_deref())
            })
            .map_err(|reason| reject(step, reason))?;

        debug!("presentation integrity verified");
        Ok(())
    }

    /// Verify an issuer-signed credential.
    pub async fn verify_credential(
        &self,
        credential: &DecomposedToken,
        resolver: &(dyn KeyResolver + Send + Sync),
    ) -> Result<(), Error> {
        let step = Step::VcIntegrity;
        let key = resolver
            .issuer_key(credential)
            .await
            .map_err(|e| Error::failed(step, e.context("unable to resolve issuer key")))?;
        key.verify_jws(credential)
            .map_err(|e| Error::failed(step, e))?;

        let payload = credential.payload();
        self.check_claims(payload)
            .and_then(|()| check_issuer(payload, self.config.expected_vc_issuer.as_deref()))
            .and_then(|()| check_vct(payload, self.config.expected_vct.as_deref()))
            .map_err(|reason| reject(step, reason))?;

        debug!("credential integrity verified");
        Ok(())
    }

    /// Temporal claims, `exp` then `nbf` then `iat`.
    pub fn check_claims(&self, payload: &Map<String, Json>) -> Result<(), Reason> {
        check_temporal(payload, self.clock)
    }
}

fn reject(step: Step, reason: Reason) -> Error {
    warn!(%step, "rejected: {reason}");
    Error::rejected(step, reason)
}

/// `exp`, `nbf` and `iat`, in that order.
pub fn check_temporal(payload: &Map<String, Json>, clock: Clock) -> Result<(), Reason> {
    let Clock { now, skew } = clock;

    if let Some(exp) = numeric_date(payload, "exp")? {
        if now > exp.saturating_add(skew) {
            return Err(Reason::Expired);
        }
    }
    if let Some(nbf) = numeric_date(payload, "nbf")? {
        if now.saturating_add(skew) < nbf {
            return Err(Reason::NotYetValid);
        }
    }
    check_issued_at(payload, clock)
}

/// `iat` must not be in the future.
pub fn check_issued_at(payload: &Map<String, Json>, clock: Clock) -> Result<(), Reason> {
    match numeric_date(payload, "iat")? {
        Some(iat) if iat > clock.now.saturating_add(clock.skew) => Err(Reason::IssuedInFuture),
        _ => Ok(()),
    }
}

pub fn check_issuer(payload: &Map<String, Json>, expected: Option<&str>) -> Result<(), Reason> {
    let (Some(found), Some(expected)) = (string_claim(payload, "iss")?, expected) else {
        return Ok(());
    };
    if found == expected {
        Ok(())
    } else {
        Err(Reason::IssuerMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
    }
}

/// `aud` as a string, or an array of strings containing the expected audience.
pub fn check_audience(payload: &Map<String, Json>, expected: Option<&str>) -> Result<(), Reason> {
    let (Some(aud), Some(expected)) = (payload.get("aud"), expected) else {
        return Ok(());
    };
    let matches = match aud {
        Json::String(aud) => aud == expected,
        Json::Array(auds) => {
            let mut matches = false;
            for aud in auds {
                match aud {
                    Json::String(aud) => matches |= aud == expected,
                    _ => return Err(malformed("aud")),
                }
            }
            matches
        }
        _ => return Err(malformed("aud")),
    };
    if matches {
        Ok(())
    } else {
        Err(Reason::AudienceMismatch {
            expected: expected.to_owned(),
            found: aud.to_string(),
        })
    }
}

pub fn check_vct(payload: &Map<String, Json>, expected: Option<&str>) -> Result<(), Reason> {
    let (Some(found), Some(expected)) = (string_claim(payload, "vct")?, expected) else {
        return Ok(());
    };
    if found == expected {
        Ok(())
    } else {
        Err(Reason::VctMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
    }
}

fn numeric_date(payload: &Map<String, Json>, claim: &str) -> Result<Option<i64>, Reason> {
    match payload.get(claim) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| malformed(claim)),
        Some(_) => Err(malformed(claim)),
    }
}

fn string_claim<'p>(payload: &'p Map<String, Json>, claim: &str) -> Result<Option<&'p str>, Reason> {
    match payload.get(claim) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s)),
        Some(_) => Err(malformed(claim)),
    }
}

fn malformed(claim: &str) -> Reason {
    Reason::MalformedClaim {
        claim: claim.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tests::{sign_jws, sign_jws_with, x5c_signing_key, TestKeys, X5C_LEAF};

    const NOW: i64 = 1_700_000_000;

    fn clock() -> Clock {
        Clock { now: NOW, skew: 0 }
    }

    fn claims(value: Json) -> Map<String, Json> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn expired_one_second_ago() {
        let payload = claims(json!({"exp": NOW - 1, "iss": "anything"}));
        assert_eq!(check_temporal(&payload, clock()), Err(Reason::Expired));
        assert_eq!(
            check_temporal(&payload, Clock { now: NOW, skew: 1 }),
            Ok(())
        );
        assert_eq!(check_temporal(&claims(json!({"exp": NOW})), clock()), Ok(()));
    }

    #[test]
    fn not_yet_valid_one_second_ahead() {
        let payload = claims(json!({"nbf": NOW + 1}));
        assert_eq!(check_temporal(&payload, clock()), Err(Reason::NotYetValid));
        assert_eq!(check_temporal(&claims(json!({"nbf": NOW})), clock()), Ok(()));
    }

    #[test]
    fn issued_in_the_future() {
        let payload = claims(json!({"iat": NOW + 60}));
        assert_eq!(check_temporal(&payload, clock()), Err(Reason::IssuedInFuture));
        assert_eq!(
            check_temporal(&payload, Clock { now: NOW, skew: 60 }),
            Ok(())
        );
    }

    #[test]
    fn temporal_checks_short_circuit_in_order() {
        let payload = claims(json!({"exp": NOW - 1, "nbf": NOW + 1, "iat": NOW + 1}));
        assert_eq!(check_temporal(&payload, clock()), Err(Reason::Expired));

        let payload = claims(json!({"nbf": NOW + 1, "iat": NOW + 1}));
        assert_eq!(check_temporal(&payload, clock()), Err(Reason::NotYetValid));
    }

    #[test]
    fn non_numeric_dates() {
        let payload = claims(json!({"exp": "tomorrow"}));
        assert_eq!(
            check_temporal(&payload, clock()),
            Err(Reason::MalformedClaim {
                claim: "exp".to_owned()
            })
        );
        assert_eq!(
            check_temporal(&claims(json!({"exp": (NOW + 10) as f64 + 0.5})), clock()),
            Ok(())
        );
    }

    #[test]
    fn far_future_dates_with_skew() {
        let skewed = Clock { now: NOW, skew: 60 };
        for exp in [json!(i64::MAX), json!(1e300)] {
            assert_eq!(check_temporal(&claims(json!({"exp": exp})), skewed), Ok(()));
        }
        assert_eq!(
            check_temporal(&claims(json!({"nbf": i64::MAX})), skewed),
            Err(Reason::NotYetValid)
        );
        assert_eq!(
            check_temporal(&claims(json!({"iat": 1e300})), Clock { now: i64::MAX, skew: 60 }),
            Ok(())
        );
    }

    #[test]
    fn audience_string_or_array() {
        let expected = Some("https://verifier.example");
        assert_eq!(
            check_audience(&claims(json!({"aud": "https://verifier.example"})), expected),
            Ok(())
        );
        assert_eq!(
            check_audience(
                &claims(json!({"aud": ["https://other.example", "https://verifier.example"]})),
                expected
            ),
            Ok(())
        );
        assert!(matches!(
            check_audience(&claims(json!({"aud": ["https://other.example"]})), expected),
            Err(Reason::AudienceMismatch { .. })
        ));
        assert!(matches!(
            check_audience(&claims(json!({"aud": 7})), expected),
            Err(Reason::MalformedClaim { .. })
        ));
        assert_eq!(check_audience(&claims(json!({})), expected), Ok(()));
        assert_eq!(check_audience(&claims(json!({"aud": "x"})), None), Ok(()));
    }

    #[test]
    fn issuer_and_vct() {
        let payload = claims(json!({"iss": "https://issuer.example", "vct": "urn:eu.europa.ec.eudi:pid:1"}));
        assert_eq!(check_issuer(&payload, Some("https://issuer.example")), Ok(()));
        assert_eq!(
            check_issuer(&payload, Some("https://evil.example")),
            Err(Reason::IssuerMismatch {
                expected: "https://evil.example".to_owned(),
                found: "https://issuer.example".to_owned(),
            })
        );
        assert_eq!(check_vct(&payload, None), Ok(()));
        assert!(matches!(
            check_vct(&payload, Some("urn:other")),
            Err(Reason::VctMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn presentation_signature_then_claims() {
        let config = VerifierConfig {
            client_id: Some("https://verifier.example".to_owned()),
            ..Default::default()
        };
        let verifier = IntegrityVerifier::new(&config, clock());
        let keys = TestKeys::default();

        let valid = sign_jws(
            json!({"alg": "ES256"}),
            json!({"aud": "https://verifier.example", "exp": NOW + 60}),
        );
        let valid = DecomposedToken::from_jws(&valid).unwrap();
        verifier.verify_presentation(&valid, &keys).await.unwrap();

        let expired = sign_jws(json!({"alg": "ES256"}), json!({"exp": NOW - 1}));
        let err = verifier
            .verify_presentation(&DecomposedToken::from_jws(&expired).unwrap(), &keys)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(&Reason::Expired));
        assert_eq!(err.step(), Some(Step::VpIntegrity));

        let wrong_audience = sign_jws(json!({"alg": "ES256"}), json!({"aud": "https://other.example"}));
        let err = verifier
            .verify_presentation(&DecomposedToken::from_jws(&wrong_audience).unwrap(), &keys)
            .await
            .unwrap_err();
        assert!(matches!(err.reason(), Some(Reason::AudienceMismatch { .. })));
    }

    #[tokio::test]
    async fn presentation_audience_check_can_be_skipped() {
        let config = VerifierConfig {
            client_id: Some("https://verifier.example".to_owned()),
            ..Default::default()
        };
        let options = ValidationOptions {
            skip_audience_check: true,
            ..Default::default()
        };
        let verifier = IntegrityVerifier::new(&config, clock()).with_options(&options);

        let token = sign_jws(json!({"alg": "ES256"}), json!({"aud": "https://other.example"}));
        verifier
            .verify_presentation(&DecomposedToken::from_jws(&token).unwrap(), &TestKeys::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bad_signature_is_a_failure() {
        let config = VerifierConfig::default();
        let verifier = IntegrityVerifier::new(&config, clock());

        // Expired as well, but the signature is checked first.
        let token = sign_jws(json!({"alg": "ES256"}), json!({"exp": NOW - 1}));
        let (structural, _) = token.rsplit_once('.').unwrap();
        let forged = format!("{structural}.{}", "A".repeat(86));

        let err = verifier
            .verify_credential(&DecomposedToken::from_jws(&forged).unwrap(), &TestKeys::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Failed(ref e) if e.step == Step::VcIntegrity));
    }

    #[tokio::test]
    async fn credential_vct_expectation() {
        let config = VerifierConfig {
            expected_vct: Some("urn:pid".to_owned()),
            ..Default::default()
        };
        let verifier = IntegrityVerifier::new(&config, clock());

        let token = sign_jws(json!({"alg": "ES256"}), json!({"vct": "urn:other"}));
        let err = verifier
            .verify_credential(&DecomposedToken::from_jws(&token).unwrap(), &TestKeys::default())
            .await
            .unwrap_err();
        assert_eq!(err.step(), Some(Step::VcIntegrity));
        assert!(matches!(err.reason(), Some(Reason::VctMismatch { .. })));
    }

    /// Resolves issuer keys through the default `x5c` lookup.
    #[derive(Debug)]
    struct X5cKeys;

    #[async_trait::async_trait]
    impl KeyResolver for X5cKeys {
        async fn holder_key(&self, presentation: &DecomposedToken) -> anyhow::Result<PublicKey> {
            PublicKey::from_x5c(presentation.header())
        }
    }

    #[tokio::test]
    async fn credential_issuer_key_from_x5c() {
        let config = VerifierConfig::default();
        let verifier = IntegrityVerifier::new(&config, clock());
        let header = json!({"alg": "ES256", "typ": "vc+sd-jwt", "x5c": [X5C_LEAF]});
        let payload = json!({"iss": "https://issuer.example", "exp": NOW + 60});

        let token = sign_jws_with(&x5c_signing_key(), header.clone(), payload.clone());
        verifier
            .verify_credential(&DecomposedToken::from_jws(&token).unwrap(), &X5cKeys)
            .await
            .unwrap();

        // Signed by a key other than the certificate's.
        let token = sign_jws(header, payload);
        let err = verifier
            .verify_credential(&DecomposedToken::from_jws(&token).unwrap(), &X5cKeys)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Failed(ref e) if e.step == Step::VcIntegrity));
    }
}
