use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::prelude::*;
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::{Error, Step};

/// Separator between the issuer-signed JWT, the disclosures and the Key Binding JWT.
pub const SD_JWT_SEPARATOR: char = '~';

const JWS_SEGMENTS: usize = 3;
const JWE_SEGMENTS: usize = 5;

/// Decrypts compact JWE serializations.
///
/// The content encryption primitives are provided by the caller, together
/// with the private key material they need.
#[async_trait]
pub trait JweDecrypter: std::fmt::Debug {
    /// Returns the plaintext of a 5-segment compact JWE.
    async fn decrypt(&self, jwe: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("token must be signed or encrypted")]
    Unsigned,

    #[error("expected 3 or 5 segments, found {0}")]
    InvalidStructure(usize),

    #[error("{part} is not valid base64url")]
    InvalidBase64 { part: &'static str },

    #[error("{part} is not valid JSON")]
    InvalidJson { part: &'static str },

    #[error("{part} is not a JSON object")]
    NotAnObject { part: &'static str },

    #[error("more than one key binding JWT in the disclosure tail")]
    AmbiguousKeyBinding,

    #[error("JWE nested deeper than {0} levels")]
    JweNestingTooDeep(usize),

    #[error("token is encrypted but no JWE decrypter is configured")]
    NoDecrypter,

    #[error("JWE decryption failed: {0}")]
    Decryption(anyhow::Error),
}

impl TokenError {
    /// Attach the pipeline step the token was decomposed in.
    ///
    /// Decryption errors are technical failures, everything else is a
    /// malformed token.
    pub(crate) fn at(self, step: Step) -> Error {
        match self {
            Self::Decryption(e) => Error::failed(step, e),
            e => Error::MalformedToken(e),
        }
    }
}

/// The parsed shape of a JWS, JWE or SD-JWT string.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedToken {
    raw: String,
    structural: String,
    header: Map<String, Json>,
    payload: Map<String, Json>,
    signature: Vec<u8>,
    disclosures: Vec<String>,
    key_binding: Option<String>,
    decrypted: bool,
}

impl DecomposedToken {
    /// Decompose a token that is expected to be signed.
    ///
    /// A 5-segment JWE fails with [TokenError::NoDecrypter]; use
    /// [TokenDecomposer] when encrypted tokens may be presented.
    pub fn from_jws(raw: &str) -> Result<Self, TokenError> {
        match split(raw)? {
            Shape::Signed(token) => Ok(token),
            Shape::Encrypted(_) => Err(TokenError::NoDecrypter),
        }
    }

    /// The token as presented, or the decrypted plaintext for a JWE.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `header.payload.signature`.
    pub fn structural_part(&self) -> &str {
        &self.structural
    }

    /// `header.payload`, the input of the JWS signature.
    pub fn signing_input(&self) -> &str {
        self.structural
            .rsplit_once('.')
            .map(|(input, _)| input)
            .unwrap_or(&self.structural)
    }

    pub fn header(&self) -> &Map<String, Json> {
        &self.header
    }

    pub fn payload(&self) -> &Map<String, Json> {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Encoded disclosures, in token order.
    pub fn disclosures(&self) -> &[String] {
        &self.disclosures
    }

    pub fn key_binding(&self) -> Option<&str> {
        self.key_binding.as_deref()
    }

    /// Returns `true` if the token was presented as a JWE.
    pub fn was_decrypted(&self) -> bool {
        self.decrypted
    }

    /// `alg` of the protected header.
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Json::as_str)
    }

    /// `typ` of the protected header.
    pub fn typ(&self) -> Option<&str> {
        self.header.get("typ").and_then(Json::as_str)
    }

    /// The presented SD-JWT without its Key Binding JWT, up to and including
    /// the last separator.
    pub fn sd_jwt_without_key_binding(&self) -> &str {
        match self.raw.rfind(SD_JWT_SEPARATOR) {
            Some(i) => &self.raw[..=i],
            None => &self.raw,
        }
    }
}

/// Splits raw tokens into [DecomposedTokens](DecomposedToken), decrypting JWEs
/// with the configured [JweDecrypter].
#[derive(Debug, Clone)]
pub struct TokenDecomposer {
    decrypter: Option<Arc<dyn JweDecrypter + Send + Sync>>,
    max_jwe_nesting: usize,
}

impl TokenDecomposer {
    pub fn new(
        decrypter: Option<Arc<dyn JweDecrypter + Send + Sync>>,
        max_jwe_nesting: usize,
    ) -> Self {
        Self {
            decrypter,
            max_jwe_nesting,
        }
    }

    pub async fn decompose(&self, raw: &str) -> Result<DecomposedToken, TokenError> {
        let mut current = raw.to_owned();
        let mut depth = 0;

        loop {
            let jwe = match split(&current)? {
                Shape::Signed(mut token) => {
                    token.decrypted = depth > 0;
                    return Ok(token);
                }
                Shape::Encrypted(jwe) => jwe.to_owned(),
            };

            if depth == self.max_jwe_nesting {
                return Err(TokenError::JweNestingTooDeep(self.max_jwe_nesting));
            }
            let decrypter = self.decrypter.as_ref().ok_or(TokenError::NoDecrypter)?;

            debug!(depth, "decrypting JWE");
            let plaintext = decrypter
                .decrypt(&jwe)
                .await
                .map_err(TokenError::Decryption)?;

            // The plaintext replaces the whole token and is decomposed afresh.
            current = String::from_utf8(plaintext).map_err(|e| {
                TokenError::Decryption(anyhow::Error::new(e).context("plaintext is not valid UTF-8"))
            })?;
            depth += 1;
        }
    }
}

enum Shape<'a> {
    Signed(DecomposedToken),
    Encrypted(&'a str),
}

fn split(raw: &str) -> Result<Shape<'_>, TokenError> {
    let raw_trimmed = raw.trim();
    if raw_trimmed.is_empty() {
        return Err(TokenError::Empty);
    }

    let (structural, tail) = match raw_trimmed.split_once(SD_JWT_SEPARATOR) {
        Some((structural, tail)) => (structural, Some(tail)),
        None => (raw_trimmed, None),
    };

    let segments: Vec<&str> = structural.split('.').collect();
    match segments.len() {
        2 => return Err(TokenError::Unsigned),
        JWE_SEGMENTS => return Ok(Shape::Encrypted(structural)),
        JWS_SEGMENTS => (),
        n => return Err(TokenError::InvalidStructure(n)),
    }

    let header = decode_object(segments[0], "header")?;
    let payload = decode_object(segments[1], "payload")?;
    let signature = BASE64_URL_SAFE_NO_PAD
        .decode(segments[2])
        .map_err(|_| TokenError::InvalidBase64 { part: "signature" })?;

    let mut disclosures = Vec::new();
    let mut key_binding = None;
    for segment in tail
        .into_iter()
        .flat_map(|t| t.split(SD_JWT_SEPARATOR))
        .filter(|s| !s.is_empty())
    {
        let dots = segment.split('.').count();
        if dots == JWS_SEGMENTS || dots == JWE_SEGMENTS {
            if key_binding.replace(segment.to_owned()).is_some() {
                return Err(TokenError::AmbiguousKeyBinding);
            }
        } else {
            disclosures.push(segment.to_owned());
        }
    }

    Ok(Shape::Signed(DecomposedToken {
        raw: raw_trimmed.to_owned(),
        structural: structural.to_owned(),
        header,
        payload,
        signature,
        disclosures,
        key_binding,
        decrypted: false,
    }))
}

fn decode_object(segment: &str, part: &'static str) -> Result<Map<String, Json>, TokenError> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::InvalidBase64 { part })?;
    match serde_json::from_slice(&bytes).map_err(|_| TokenError::InvalidJson { part })? {
        Json::Object(map) => Ok(map),
        _ => Err(TokenError::NotAnObject { part }),
    }
}
