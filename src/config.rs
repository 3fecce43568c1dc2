use serde::Deserialize;

/// Verifier-wide expectations and limits.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// The verifier's `client_id`, expected as the audience of presentations
    /// and Key Binding JWTs.
    pub client_id: Option<String>,
    /// Expected `iss` of presentations.
    pub expected_vp_issuer: Option<String>,
    /// Expected `iss` of credentials.
    pub expected_vc_issuer: Option<String>,
    /// Expected `vct` of credentials.
    pub expected_vct: Option<String>,
    /// Leeway in seconds applied to `exp`, `nbf` and `iat`.
    pub clock_skew: i64,
    /// Maximum nesting of the credential payload searched for `_sd` arrays.
    pub max_claim_depth: usize,
    /// Maximum number of JWE layers wrapped around a token.
    pub max_jwe_nesting: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            expected_vp_issuer: None,
            expected_vc_issuer: None,
            expected_vct: None,
            clock_skew: 0,
            max_claim_depth: 32,
            max_jwe_nesting: 2,
        }
    }
}

/// Stages of the pipeline that can be switched off.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationOptions {
    pub skip_state_check: bool,
    pub skip_vp_signature_checks: bool,
    pub skip_vc_signature_checks: bool,
    /// Skip the `aud` checks of presentations and Key Binding JWTs.
    pub skip_audience_check: bool,
    pub skip_nonce_check: bool,
    /// Reject credentials presented without a Key Binding JWT.
    pub require_holder_binding: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    /// Run every verification stage.
    #[default]
    FullValidation,
    /// Stop after credentials are extracted, without verifying them.
    ExtractOnly,
}

/// How a single Authorization Response is processed.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessConfig {
    pub process_type: ProcessType,
    pub options: ValidationOptions,
}

impl ProcessConfig {
    pub fn extract_only() -> Self {
        Self {
            process_type: ProcessType::ExtractOnly,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn partial_configuration_uses_defaults() {
        let config: VerifierConfig =
            serde_json::from_value(json!({"client_id": "https://verifier.example"})).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("https://verifier.example"));
        assert_eq!(config.max_claim_depth, 32);
        assert_eq!(config.max_jwe_nesting, 2);
        assert_eq!(config.clock_skew, 0);
    }

    #[test]
    fn process_config() {
        let config: ProcessConfig = serde_json::from_value(json!({
            "process_type": "extract_only",
            "options": {"skip_nonce_check": true},
        }))
        .unwrap();
        assert_eq!(config.process_type, ProcessType::ExtractOnly);
        assert!(config.options.skip_nonce_check);
        assert!(!config.options.skip_state_check);

        assert_eq!(ProcessConfig::default().process_type, ProcessType::FullValidation);
    }
}
