use core::fmt;
use std::{borrow::Cow, str::FromStr};

use serde::{Deserialize, Serialize};

const FORMAT_JWT: &str = "jwt";
const FORMAT_JWT_VC: &str = "jwt_vc";
const FORMAT_JWT_VP: &str = "jwt_vp";
const FORMAT_LDP: &str = "ldp";
const FORMAT_LDP_VC: &str = "ldp_vc";
const FORMAT_LDP_VP: &str = "ldp_vp";
const FORMAT_AC_VC: &str = "ac_vc";
const FORMAT_AC_VP: &str = "ac_vp";
const FORMAT_MSO_MDOC: &str = "mso_mdoc";
const FORMAT_SD_JWT: &str = "sd_jwt";
const FORMAT_VC_SD_JWT: &str = "vc+sd-jwt";
// `+` becomes a space when a form body is decoded without escaping it first.
const FORMAT_VC_SD_JWT_FORM_DECODED: &str = "vc sd-jwt";

/// The `format` of a descriptor map entry in a presentation submission.
///
/// Registry of claim format type: https://identity.foundation/claim-format-registry/#registry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClaimFormatDesignation {
    /// A JSON Web Token (JWT) as defined by [RFC7519](https://identity.foundation/claim-format-registry/#ref:RFC7519).
    Jwt,

    /// A W3C Verifiable Credential secured as a JWT.
    JwtVc,

    /// See [JwtVc](ClaimFormatDesignation::JwtVc).
    JwtVp,

    /// A Linked-Data Proof submitted as an object.
    Ldp,

    /// Verifiable Credentials signed with Linked Data Proof formats.
    LdpVc,

    /// See [LdpVc](ClaimFormatDesignation::LdpVc).
    LdpVp,

    /// Verifiable Credentials using AnonCreds.
    AcVc,

    /// Verifiable Presentations using AnonCreds.
    AcVp,

    /// ISO/IEC 18013-5:2021 mobile document.
    MsoMDoc,

    /// Generic SD-JWT.
    SdJwt,

    /// IETF SD-JWT Verifiable Credential.
    ///
    /// Parsed from both `vc+sd-jwt` and its form-decoded variant `vc sd-jwt`.
    VcSdJwt,

    /// Other claim format designations not covered by the above.
    Other(String),
}

impl ClaimFormatDesignation {
    pub fn from_name(name: Cow<str>) -> Self {
        match name.as_ref() {
            FORMAT_JWT => Self::Jwt,
            FORMAT_JWT_VC => Self::JwtVc,
            FORMAT_JWT_VP => Self::JwtVp,
            FORMAT_LDP => Self::Ldp,
            FORMAT_LDP_VC => Self::LdpVc,
            FORMAT_LDP_VP => Self::LdpVp,
            FORMAT_AC_VC => Self::AcVc,
            FORMAT_AC_VP => Self::AcVp,
            FORMAT_MSO_MDOC => Self::MsoMDoc,
            FORMAT_SD_JWT => Self::SdJwt,
            FORMAT_VC_SD_JWT | FORMAT_VC_SD_JWT_FORM_DECODED => Self::VcSdJwt,
            _ => Self::Other(name.into_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Jwt => FORMAT_JWT,
            Self::JwtVc => FORMAT_JWT_VC,
            Self::JwtVp => FORMAT_JWT_VP,
            Self::Ldp => FORMAT_LDP,
            Self::LdpVc => FORMAT_LDP_VC,
            Self::LdpVp => FORMAT_LDP_VP,
            Self::AcVc => FORMAT_AC_VC,
            Self::AcVp => FORMAT_AC_VP,
            Self::MsoMDoc => FORMAT_MSO_MDOC,
            Self::SdJwt => FORMAT_SD_JWT,
            Self::VcSdJwt => FORMAT_VC_SD_JWT,
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for ClaimFormatDesignation {
    fn from(s: &str) -> Self {
        Self::from_name(Cow::Borrowed(s))
    }
}

impl From<String> for ClaimFormatDesignation {
    fn from(value: String) -> Self {
        Self::from_name(Cow::Owned(value))
    }
}

impl FromStr for ClaimFormatDesignation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for ClaimFormatDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl Serialize for ClaimFormatDesignation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.name().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClaimFormatDesignation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Into::into)
    }
}
