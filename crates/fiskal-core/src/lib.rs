#![forbid(unsafe_code)]

//! Shared foundations for the fiskal client: the error taxonomy and the
//! algorithm/namespace constants of the fixed exchange profile.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
