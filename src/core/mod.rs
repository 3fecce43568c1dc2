pub mod credential_format;
pub mod integrity;
pub mod key_binding;
pub mod object;
pub mod presentation;
pub mod presentation_submission;
pub mod response;
pub mod sd_jwt;
pub mod token;
