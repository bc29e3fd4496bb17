#![forbid(unsafe_code)]

//! Key material for the fiskal client.
//!
//! Outbound signing uses a merchant private key paired with its
//! certificate; inbound verification uses a standalone authority
//! certificate. Both are loaded once at process start and are immutable
//! (and freely shareable across threads) for the process lifetime.

pub mod key;
pub mod keyinfo;
pub mod loader;

pub use key::{SigningKeyMaterial, VerificationCertificate};
