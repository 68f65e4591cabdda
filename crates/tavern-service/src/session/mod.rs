//! Session operations.

mod chat;
mod combat;
mod key;
mod membership;
mod presence;
mod service;
mod signal;
mod types;


pub use key::generate_session_key;
pub use service::SessionService;
pub use types::{
    CharacterChoice, JoinOutcome, LeaveOutcome, NewChatRoom, NewSession, ParticipantRole,
    StatusChange,
};
