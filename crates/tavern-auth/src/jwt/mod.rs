//! JWT claims, signing and verification.

pub mod claims;
pub mod decoder;
pub mod encoder;
