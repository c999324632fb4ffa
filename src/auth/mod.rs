//! Credential handling: outbound bearer tokens and inbound identity.

pub mod token;
pub mod verifier;

pub use token::{MetadataTokenProvider, ServiceAccountTokenProvider, TokenProvider};
pub use verifier::{GoogleIdVerifier, IdentityVerifier};
