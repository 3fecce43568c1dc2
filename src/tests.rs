//! Fixtures shared by the unit tests: ES256 keys, signed SD-JWT VCs,
//! disclosures and Key Binding JWTs.
use anyhow::Result;
use async_trait::async_trait;
use base64::prelude::*;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde_json::{json, Value as Json};
use ssi::jwk::JWK;

use crate::core::{
    integrity::{KeyResolver, PublicKey},
    token::DecomposedToken,
};

pub fn issuer_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x11; 32]).unwrap()
}

pub fn holder_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x22; 32]).unwrap()
}

/// Self-signed P-256 certificate (`CN=issuer.example`) of [x5c_signing_key].
pub const X5C_LEAF: &str = "MIIBiTCCAS+gAwIBAgIUTzcHMCg6SVPpypqy2nBKio30734wCgYIKoZIzj0EAwIwGTEXMBUGA1UEAwwOaXNzdWVyLmV4YW1wbGUwIBcNMjYxMDE2MDA0NTIxWhgPMjEyNjA5MjIwMDQ1MjFaMBkxFzAVBgNVBAMMDmlzc3Vlci5leGFtcGxlMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEJaGDWU6FCUnxtXqN48/qjxQjhIpflBDSjvqdd5ovW5LhJxZyI4s6k0lZ3QzWGftwPwIo1lpoU1459YV+Ohe6lqNTMFEwHQYDVR0OBBYEFJ3qE4dLeqAYA3v/cPOv+ML50S+/MB8GA1UdIwQYMBaAFJ3qE4dLeqAYA3v/cPOv+ML50S+/MA8GA1UdEwEB/wQFMAMBAf8wCgYIKoZIzj0EAwIDSAAwRQIgWAWM5pPMA6afO5/w3bRqcJH/JrT3rom9UuDkEemjOVMCIQDxdea+grJP+IyTydhv5+sK/+aVwf6g3QFnhZ63i943Ng==";

pub fn x5c_signing_key() -> SigningKey {
    const SCALAR: [u8; 32] = [
        0xa2, 0xe4, 0xd6, 0x74, 0xfa, 0x31, 0xc1, 0x27, 0xf3, 0xeb, 0x0b, 0x3f, 0xeb, 0x57, 0xde,
        0x22, 0xdf, 0x61, 0x46, 0x43, 0xb2, 0x38, 0x8c, 0xa7, 0x0d, 0xe5, 0xa2, 0x16, 0xca, 0xdc,
        0x90, 0x27,
    ];
    SigningKey::from_slice(&SCALAR).unwrap()
}

fn jwk(key: &SigningKey) -> JWK {
    let jwk = p256::PublicKey::from(key.verifying_key()).to_jwk_string();
    serde_json::from_str(&jwk).unwrap()
}

pub fn issuer_jwk() -> JWK {
    jwk(&issuer_signing_key())
}

pub fn holder_jwk() -> JWK {
    jwk(&holder_signing_key())
}

pub fn issuer_key() -> PublicKey {
    PublicKey::P256(issuer_signing_key().verifying_key().to_owned())
}

fn b64(value: &Json) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(value.to_string())
}

pub fn sign_jws_with(key: &SigningKey, header: Json, payload: Json) -> String {
    let input = format!("{}.{}", b64(&header), b64(&payload));
    let signature: Signature = key.sign(input.as_bytes());
    format!(
        "{input}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(signature.to_bytes())
    )
}

/// A JWS signed by the issuer.
pub fn sign_jws(header: Json, payload: Json) -> String {
    sign_jws_with(&issuer_signing_key(), header, payload)
}

/// Encoded `[salt, key, value]` disclosure.
pub fn disclosure(salt: &str, key: &str, value: Json) -> String {
    b64(&json!([salt, key, value]))
}

/// An issuer-signed SD-JWT VC followed by `disclosures` and a trailing `~`.
pub fn issue_sd_jwt(payload: Json, disclosures: &[&str]) -> String {
    let jws = sign_jws(json!({"alg": "ES256", "typ": "vc+sd-jwt"}), payload);
    let mut sd_jwt = format!("{jws}~");
    for disclosure in disclosures {
        sd_jwt.push_str(disclosure);
        sd_jwt.push('~');
    }
    sd_jwt
}

/// Like [issue_sd_jwt], bound to the holder key through `cnf.jwk`.
pub fn issue_sd_jwt_with_cnf(mut payload: Json, disclosures: &[&str]) -> String {
    payload["cnf"] = json!({"jwk": holder_jwk()});
    issue_sd_jwt(payload, disclosures)
}

/// A Key Binding JWT signed by the holder.
pub fn key_binding_jwt(claims: Json) -> String {
    sign_jws_with(
        &holder_signing_key(),
        json!({"alg": "ES256", "typ": "kb+jwt"}),
        claims,
    )
}

/// Resolves presentations and credentials to the issuer key.
#[derive(Debug, Default)]
pub struct TestKeys;

#[async_trait]
impl KeyResolver for TestKeys {
    async fn holder_key(&self, _presentation: &DecomposedToken) -> Result<PublicKey> {
        Ok(issuer_key())
    }

    async fn issuer_key(&self, _credential: &DecomposedToken) -> Result<PublicKey> {
        Ok(issuer_key())
    }
}
