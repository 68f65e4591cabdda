//! # tavern-service
//!
//! Business logic for Tavern. Every mutation follows the same path:
//! load the session, authorize the caller, validate input, apply the
//! change, persist with a version check, and only then broadcast.

pub mod context;
pub mod dice;
pub mod session;

pub use context::RequestContext;
pub use session::SessionService;
