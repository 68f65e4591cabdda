//! # tavern-realtime
//!
//! Server-Sent Events engine for Tavern sessions. Provides:
//!
//! - A registry of open event streams grouped by session
//! - A broadcaster that serializes each event once and fans it out,
//!   evicting connections whose writes fail
//! - Guarded streams that announce joins and leaves exactly once
//! - Lightweight counters for the health endpoint

pub mod broadcast;
pub mod connection;
pub mod metrics;
pub mod server;
pub mod stream;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use connection::{ConnectionHandle, ConnectionRegistry};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use server::RealtimeEngine;
pub use stream::{ConnectionGuard, EventStream};
