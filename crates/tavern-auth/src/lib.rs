//! # tavern-auth
//!
//! Bearer-token handling. Accounts and login live in another service;
//! this crate only verifies the HS256 tokens it issues, and can mint
//! tokens with the same secret for local development and tests.

pub mod jwt;

pub use jwt::claims::Claims;
pub use jwt::decoder::JwtDecoder;
pub use jwt::encoder::JwtEncoder;
