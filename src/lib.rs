// Platform-agnostic pieces live in bskycore and are re-exported here
pub use bskycore::{api, config, convert, identity, ids, jwt, net, types, xrpc};
pub use bskyproto as proto;

pub mod backfill;
pub mod chatinfo;
pub mod client;
pub mod connector;
pub mod handlers;
pub mod login;
pub mod outbound;
pub mod store;
pub mod sync;
pub mod user_login;

pub use client::{BlueskyClient, SessionError};
pub use connector::BlueskyConnector;
pub use login::{LoginComplete, LoginError, PasswordLogin};
pub use user_login::UserLogin;
