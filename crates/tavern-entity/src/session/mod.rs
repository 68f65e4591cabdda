//! Session aggregate and its embedded records.

pub mod chat;
pub mod initiative;
pub mod model;
pub mod player;

pub use chat::{ChatMessage, ChatRoom, GENERAL_ROOM_ID, MessageType, normalize_room_id};
pub use initiative::InitiativeEntry;
pub use model::{Session, SessionSnapshot, SessionSummary};
pub use player::Player;
