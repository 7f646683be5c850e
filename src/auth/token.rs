//! Token models: redacted secrets, OAuth access tokens, and OIDC identity tokens.

pub mod access;
pub mod id_token;
pub mod secret;
