use anyhow::{bail, Context, Error, Result};
use async_trait::async_trait;
use base64::prelude::*;
use p256::ecdsa::signature::Verifier as _;
use serde_json::{Map, Value as Json};
use ssi::jwk::JWK;
use tracing::debug;
use x509_cert::{
    der::{referenced::OwnedToRef, Decode},
    spki::SubjectPublicKeyInfoRef,
    Certificate,
};

use crate::core::token::DecomposedToken;

/// A public key able to verify JWS signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Construct a [PublicKey] from [SubjectPublicKeyInfoRef].
    pub fn from_spki(spki: SubjectPublicKeyInfoRef<'_>) -> Result<Self> {
        spki.try_into()
            .map(Self::P256)
            .map_err(Error::from)
            .context("unsupported subject public key")
    }

    pub fn from_jwk(jwk: &JWK) -> Result<Self> {
        let jwk = serde_json::to_string(jwk)?;
        p256::PublicKey::from_jwk_str(&jwk)
            .map(|pk| Self::P256(pk.into()))
            .map_err(|e| anyhow::anyhow!("unsupported JWK: {e}"))
    }

    /// Extract the public key of the leaf certificate of an `x5c` header.
    pub fn from_x5c(header: &Map<String, Json>) -> Result<Self> {
        let Json::Array(x5chain) = header
            .get("x5c")
            .context("'x5c' was missing from jwt headers")?
        else {
            bail!("'x5c' header was not an array")
        };

        let Json::String(b64_x509) = x5chain.first().context("'x5c' was an empty array")? else {
            bail!("'x5c' header was not an array of strings");
        };

        let leaf_cert_der = BASE64_STANDARD_NO_PAD
            .decode(b64_x509.trim_end_matches('='))
            .context("leaf certificate in 'x5c' was not valid base64")?;

        let leaf_cert = Certificate::from_der(&leaf_cert_der)
            .context("leaf certificate in 'x5c' was not valid DER")?;

        debug!("Leaf certificate: {leaf_cert:?}");

        Self::from_spki(
            leaf_cert
                .tbs_certificate
                .subject_public_key_info
                .owned_to_ref(),
        )
    }

    /// Extract the holder key of a `cnf` confirmation claim.
    pub fn from_cnf(payload: &Map<String, Json>) -> Result<Self> {
        let jwk = payload
            .get("cnf")
            .and_then(|cnf| cnf.get("jwk"))
            .context("'cnf.jwk' was missing from the credential")?;
        let jwk: JWK = serde_json::from_value(jwk.clone()).context("'cnf.jwk' was not a JWK")?;
        Self::from_jwk(&jwk)
    }

    /// Verify `signature` over `payload` with the algorithm named in the JWS `alg` header.
    pub fn verify(&self, alg: &str, payload: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::P256(key) => {
                if alg != "ES256" {
                    bail!("P-256 key cannot verify signatures made with '{alg}'")
                }
                let signature = p256::ecdsa::Signature::from_slice(signature)?;
                key.verify(payload, &signature).map_err(Error::from)
            }
        }
    }

    /// Verify the signature of a decomposed JWS.
    pub fn verify_jws(&self, token: &DecomposedToken) -> Result<()> {
        let alg = token.alg().context("'alg' was missing from jwt headers")?;
        self.verify(alg, token.signing_input().as_bytes(), token.signature())
            .context("signature could not be verified")
    }
}

/// Resolves the keys tokens are verified with.
#[async_trait]
pub trait KeyResolver: std::fmt::Debug {
    /// Key of the holder, verifying the presentation signature.
    async fn holder_key(&self, presentation: &DecomposedToken) -> Result<PublicKey>;

    /// Key of the issuer, verifying the credential signature.
    ///
    /// Defaults to the leaf certificate of the `x5c` header.
    async fn issuer_key(&self, credential: &DecomposedToken) -> Result<PublicKey> {
        PublicKey::from_x5c(credential.header())
    }

    /// Key the credential is bound to, verifying the Key Binding JWT.
    ///
    /// Defaults to the `cnf.jwk` claim.
    async fn cnf_key(&self, credential: &DecomposedToken) -> Result<PublicKey> {
        PublicKey::from_cnf(credential.payload())
    }
}

/// Resolves presentations to a single, pre-configured holder key.
#[derive(Debug, Clone)]
pub struct StaticKeyResolver(JWK);

impl StaticKeyResolver {
    pub fn new(jwk: JWK) -> Self {
        Self(jwk)
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn holder_key(&self, _presentation: &DecomposedToken) -> Result<PublicKey> {
        PublicKey::from_jwk(&self.0)
    }
}
