use std::{fmt, str::FromStr};

use base64::prelude::*;
use blake2::digest::consts::U32;
use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::error::Error;

/// Name of the claim carrying the disclosure hash algorithm.
pub const SD_ALG_CLAIM_NAME: &str = "_sd_alg";

/// Elements of the `_sd_alg` claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SdAlg {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2b256,
    Blake2b512,
    Blake2s256,
}

impl SdAlg {
    /// Algorithm assumed for `sd_hash` when `_sd_alg` is absent.
    pub const DEFAULT: Self = Self::Sha256;

    /// String encoding of the `_sd_alg` claim.
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Sha224 => "sha-224",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Blake2b256 => "blake2b-256",
            Self::Blake2b512 => "blake2b-512",
            Self::Blake2s256 => "blake2s-256",
        }
    }

    /// Raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha224 => sha2::Sha224::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
            Self::Sha3_224 => sha3::Sha3_224::digest(data).to_vec(),
            Self::Sha3_256 => sha3::Sha3_256::digest(data).to_vec(),
            Self::Sha3_384 => sha3::Sha3_384::digest(data).to_vec(),
            Self::Sha3_512 => sha3::Sha3_512::digest(data).to_vec(),
            Self::Blake2b256 => blake2::Blake2b::<U32>::digest(data).to_vec(),
            Self::Blake2b512 => blake2::Blake2b512::digest(data).to_vec(),
            Self::Blake2s256 => blake2::Blake2s256::digest(data).to_vec(),
        }
    }

    /// Base64url encoded digest of `data`, as found in `_sd` arrays and `sd_hash`.
    pub fn hash(&self, data: &[u8]) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(self.digest(data))
    }
}

impl FromStr for SdAlg {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "sha-224" => Self::Sha224,
            "sha-256" => Self::Sha256,
            "sha-384" => Self::Sha384,
            "sha-512" => Self::Sha512,
            "sha3-224" => Self::Sha3_224,
            "sha3-256" => Self::Sha3_256,
            "sha3-384" => Self::Sha3_384,
            "sha3-512" => Self::Sha3_512,
            "blake2b-256" => Self::Blake2b256,
            "blake2b-512" => Self::Blake2b512,
            "blake2s-256" => Self::Blake2s256,
            _ => return Err(Error::UnsupportedSdAlg(s.to_owned())),
        })
    }
}

impl fmt::Display for SdAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_str().fmt(f)
    }
}

impl Serialize for SdAlg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SdAlg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
