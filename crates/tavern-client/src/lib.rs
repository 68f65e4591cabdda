//! # tavern-client
//!
//! Client side of a Tavern session:
//!
//! - [`SessionClient`] for the REST endpoints
//! - [`SessionSubscriber`], which follows a session's event stream and
//!   reconnects with exponential backoff
//! - [`PresenceTracker`], which reports online/offline from activity
//!   signals and a heartbeat

pub mod error;
pub mod presence;
pub mod rest;
pub mod sse;
pub mod subscriber;
pub mod transport;

pub use error::ClientError;
pub use presence::{ActivitySignal, PresenceTracker, StatusSink};
pub use rest::{SessionClient, SessionStatusSink};
pub use subscriber::{BackoffPolicy, SessionEventHandler, SessionSubscriber, SubscriberState};
pub use transport::{EventTransport, HttpTransport};
