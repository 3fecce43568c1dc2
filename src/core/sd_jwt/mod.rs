//! Selective disclosure validation.
//!
//! Every disclosure presented by the holder must hash to a digest the issuer
//! committed to in one of the `_sd` arrays of the credential payload. `_sd`
//! arrays are collected over the whole payload, including nested objects and
//! arrays.
use std::collections::HashSet;

use serde_json::{Map, Value as Json};
use tracing::warn;

use crate::{
    core::token::DecomposedToken,
    error::{Error, Reason, Step},
};

pub use self::{
    digest::{SdAlg, SD_ALG_CLAIM_NAME},
    disclosure::Disclosure,
};

mod digest;
mod disclosure;

/// Name of the claim holding disclosure digests.
pub const SD_CLAIM_NAME: &str = "_sd";

/// Reads the `_sd_alg` claim.
pub fn sd_alg(payload: &Map<String, Json>) -> Result<Option<SdAlg>, Error> {
    match payload.get(SD_ALG_CLAIM_NAME) {
        None => Ok(None),
        Some(Json::String(name)) => name.parse().map(Some),
        Some(other) => Err(Error::UnsupportedSdAlg(other.to_string())),
    }
}

/// Collects every digest found in an `_sd` array anywhere in `payload`.
///
/// Fails with [Error::ClaimNestingTooDeep] beyond `max_depth` levels of nesting.
pub fn collect_commitments(
    payload: &Map<String, Json>,
    max_depth: usize,
) -> Result<HashSet<String>, Error> {
    let mut commitments = HashSet::new();
    collect_in_object(payload, 0, max_depth, &mut commitments)?;
    Ok(commitments)
}

fn collect_in_object(
    object: &Map<String, Json>,
    depth: usize,
    max_depth: usize,
    commitments: &mut HashSet<String>,
) -> Result<(), Error> {
    for (key, value) in object {
        if key == SD_CLAIM_NAME {
            if let Json::Array(digests) = value {
                commitments.extend(digests.iter().filter_map(Json::as_str).map(ToOwned::to_owned));
                continue;
            }
        }
        collect_in_value(value, depth + 1, max_depth, commitments)?;
    }
    Ok(())
}

fn collect_in_value(
    value: &Json,
    depth: usize,
    max_depth: usize,
    commitments: &mut HashSet<String>,
) -> Result<(), Error> {
    if depth > max_depth {
        return Err(Error::ClaimNestingTooDeep(max_depth));
    }
    match value {
        Json::Object(object) => collect_in_object(object, depth, max_depth, commitments),
        Json::Array(items) => items
            .iter()
            .try_for_each(|item| collect_in_value(item, depth + 1, max_depth, commitments)),
        _ => Ok(()),
    }
}

/// Checks a single encoded disclosure against the issuer's commitments.
///
/// Independent of any other disclosure of the credential.
pub fn check_disclosure(
    encoded: &str,
    alg: SdAlg,
    commitments: &HashSet<String>,
) -> Result<Disclosure, Error> {
    let disclosure = Disclosure::decode(encoded)?;
    if commitments.contains(&alg.hash(encoded.as_bytes())) {
        Ok(disclosure)
    } else {
        Err(Error::rejected(
            Step::SelectiveDisclosure,
            Reason::UndisclosedCommitment {
                claim: disclosure.key,
            },
        ))
    }
}

/// Validates every disclosure of a credential, in token order, and returns
/// them decoded.
///
/// A credential without disclosures is valid and does not need `_sd_alg`.
pub fn validate_disclosures(
    credential: &DecomposedToken,
    max_depth: usize,
) -> Result<Vec<Disclosure>, Error> {
    if credential.disclosures().is_empty() {
        return Ok(Vec::new());
    }

    let alg = sd_alg(credential.payload())?.ok_or(Error::MissingSdAlg)?;
    let commitments = collect_commitments(credential.payload(), max_depth)?;

    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(credential.disclosures().len());
    for encoded in credential.disclosures() {
        let disclosure = check_disclosure(encoded, alg, &commitments).inspect_err(|e| {
            warn!("disclosure rejected: {e}");
        })?;
        if !seen.insert(encoded.as_str()) {
            warn!(claim = %disclosure.key, "duplicate disclosure");
            return Err(Error::rejected(
                Step::SelectiveDisclosure,
                Reason::DuplicateDisclosure {
                    claim: disclosure.key,
                },
            ));
        }
        valid.push(disclosure);
    }

    Ok(valid)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tests::{disclosure, issue_sd_jwt};

    #[test]
    fn commitments_in_nested_objects_and_arrays() {
        let payload = json!({
            "_sd": ["root"],
            "address": {"_sd": ["nested"], "street": "Main"},
            "nationalities": [{"_sd": ["in_array"]}, [{"_sd": ["deeper"]}]],
            "_sd_alg": "sha-256",
        });

        let commitments =
            collect_commitments(payload.as_object().unwrap(), 32).unwrap();
        let expected: HashSet<String> = ["root", "nested", "in_array", "deeper"]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();
        assert_eq!(commitments, expected);
    }

    #[test]
    fn nesting_is_bounded() {
        let mut value = json!({"_sd": ["bottom"]});
        for _ in 0..40 {
            value = json!({ "nested": value });
        }

        assert!(matches!(
            collect_commitments(value.as_object().unwrap(), 32),
            Err(Error::ClaimNestingTooDeep(32))
        ));
        assert!(collect_commitments(value.as_object().unwrap(), 64).is_ok());
    }

    #[test]
    fn revealing_committed_disclosures() {
        let given_name = disclosure("salt1", "given_name", json!("Erika"));
        let street = disclosure("salt2", "street_address", json!("Heidestraße 17"));
        let token = issue_sd_jwt(
            json!({
                "_sd": [SdAlg::Sha256.hash(given_name.as_bytes())],
                "address": {"_sd": [SdAlg::Sha256.hash(street.as_bytes())]},
                "_sd_alg": "sha-256",
            }),
            &[given_name.as_str(), street.as_str()],
        );

        let valid = validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32).unwrap();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].key, "given_name");
        assert_eq!(valid[1].key, "street_address");
        assert_eq!(valid[1].value, json!("Heidestraße 17"));
    }

    #[test]
    fn tampered_disclosure_is_rejected_alone() {
        let genuine = disclosure("salt1", "given_name", json!("Erika"));
        let other = disclosure("salt2", "family_name", json!("Mustermann"));
        let commitments: HashSet<String> = [&genuine, &other]
            .iter()
            .map(|d| SdAlg::Sha256.hash(d.as_bytes()))
            .collect();

        let tampered = disclosure("salt1", "given_name", json!("Erikb"));
        let err = check_disclosure(&tampered, SdAlg::Sha256, &commitments).unwrap_err();
        assert_eq!(
            err.reason(),
            Some(&Reason::UndisclosedCommitment {
                claim: "given_name".to_owned()
            })
        );
        assert_eq!(err.step(), Some(Step::SelectiveDisclosure));

        assert!(check_disclosure(&other, SdAlg::Sha256, &commitments).is_ok());
        assert!(check_disclosure(&genuine, SdAlg::Sha256, &commitments).is_ok());
    }

    #[test]
    fn no_disclosures_do_not_need_sd_alg() {
        let token = issue_sd_jwt(json!({"vct": "pid"}), &[]);
        let valid = validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32).unwrap();
        assert!(valid.is_empty());
    }

    #[test]
    fn missing_or_unsupported_sd_alg() {
        let d = disclosure("salt", "a", json!(1));

        let token = issue_sd_jwt(json!({"_sd": []}), &[d.as_str()]);
        assert!(matches!(
            validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32),
            Err(Error::MissingSdAlg)
        ));

        let token = issue_sd_jwt(json!({"_sd": [], "_sd_alg": "md5"}), &[d.as_str()]);
        assert!(matches!(
            validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32),
            Err(Error::UnsupportedSdAlg(_))
        ));
    }

    #[test]
    fn duplicate_disclosure() {
        let d = disclosure("salt", "a", json!(1));
        let token = issue_sd_jwt(
            json!({"_sd": [SdAlg::Sha256.hash(d.as_bytes())], "_sd_alg": "sha-256"}),
            &[d.as_str(), d.as_str()],
        );

        let err = validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32).unwrap_err();
        assert_eq!(
            err.reason(),
            Some(&Reason::DuplicateDisclosure {
                claim: "a".to_owned()
            })
        );
    }

    #[test]
    fn other_hash_algorithms() {
        let d = disclosure("salt", "a", json!(1));
        let token = issue_sd_jwt(
            json!({"_sd": [SdAlg::Sha3_256.hash(d.as_bytes())], "_sd_alg": "sha3-256"}),
            &[d.as_str()],
        );

        let valid = validate_disclosures(&DecomposedToken::from_jws(&token).unwrap(), 32).unwrap();
        assert_eq!(valid[0].key, "a");
    }
}
