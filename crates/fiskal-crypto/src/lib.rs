#![forbid(unsafe_code)]

//! Cryptographic primitives for the fiskal client.
//!
//! The exchange profile is fixed: SHA-1 reference digests, RSA-SHA1
//! (PKCS#1 v1.5) signatures, and MD5 for the protective-code rendering.
//! Algorithms are dispatched from their XML Security URIs so that
//! inbound documents declaring anything else fail loudly.

pub mod digest;
pub mod sign;
