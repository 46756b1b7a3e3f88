pub mod filestore;

pub use bskycore::store::*;
pub use filestore::FileStore;
