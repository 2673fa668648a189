//! Credential record and secret wrappers.

pub mod credential;
pub mod secret;
