pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryLoginStore;
pub use traits::{LoginStore, PersistedLogin, RemoteProfile, UserLoginMetadata};
