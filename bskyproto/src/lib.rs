//! Serde models for the subset of the AT Protocol / Bluesky chat lexicons
//! used by the bridge. Field names follow the lexicon JSON (camelCase) and
//! open unions are decoded through their `$type` discriminator.

pub mod actor;
pub mod atproto;
pub mod chat;

pub use actor::ProfileViewDetailed;
pub use atproto::{CreateSessionInput, DidDocument, DidService, SessionOutput};
pub use chat::{
    ConvoView, DeletedMessageView, LogEntry, MessageInput, MessageRef, MessageView,
    ProfileViewBasic,
};
