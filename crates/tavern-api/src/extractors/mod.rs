//! Custom Axum extractors.

pub mod auth;
pub mod path;
pub mod status;

pub use auth::AuthUser;
pub use path::SessionPath;
pub use status::StatusPayload;
