#![forbid(unsafe_code)]

pub use fiskal_c14n as c14n;
pub use fiskal_core as core;
pub use fiskal_crypto as crypto;
pub use fiskal_dsig as dsig;
pub use fiskal_keys as keys;
pub use fiskal_pcode as pcode;
pub use fiskal_soap as soap;
pub use fiskal_xml as xml;
