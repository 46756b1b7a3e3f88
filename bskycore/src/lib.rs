pub use bskyproto as proto;

pub mod api;
pub mod config;
pub mod convert;
pub mod identity;
pub mod ids;
pub mod jwt;
pub mod net;
pub mod store;
pub mod types;
pub mod xrpc;
