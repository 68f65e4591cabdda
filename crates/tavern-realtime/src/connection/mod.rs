//! Connection handles and the per-session registry.

pub mod handle;
pub mod registry;

pub use handle::{ConnectionHandle, SendError};
pub use registry::ConnectionRegistry;
