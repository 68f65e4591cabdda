//! Route handlers.

pub mod chat;
pub mod dice;
pub mod events;
pub mod health;
pub mod initiative;
pub mod session;
pub mod status;
pub mod webrtc;
