//! # tgrelay-session
//!
//! The single authorized platform session behind the bridge.
//!
//! - [`Session`]: lifecycle state machine plus one typed method per
//!   platform capability
//! - [`Transport`]: the wire seam, with [`BotApiTransport`] for the Bot HTTP
//!   API and [`testing::ScriptedTransport`] for tests
//! - [`SessionStore`]: the persisted session artifact
//! - [`types`]: platform objects and their [`tgrelay_core::Encode`] mappings

#![deny(unsafe_code)]

pub mod bot_api;
pub mod credentials;
pub mod errors;
pub mod session;
pub mod store;
pub mod testing;
pub mod transport;
pub mod types;

pub use bot_api::BotApiTransport;
pub use credentials::Credentials;
pub use errors::{PlatformError, SessionError};
pub use session::{ProfileUpdate, SendOptions, Session, SessionState};
pub use store::{SessionArtifact, SessionStore};
pub use transport::Transport;
pub use types::{ChatAction, Chat, Entity, Message, MessageId, ParseMode, User};
