//! # tavern-entity
//!
//! Domain model for Tavern: the [`Session`](session::Session) aggregate
//! with its embedded players, chat rooms, messages and initiative order,
//! plus the [`SessionEvent`](event::SessionEvent) sum type that travels
//! over the event stream.

pub mod event;
pub mod session;

pub use event::SessionEvent;
pub use session::{
    ChatMessage, ChatRoom, InitiativeEntry, MessageType, Player, Session, SessionSnapshot,
    SessionSummary,
};
