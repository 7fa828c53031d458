pub mod persistence;
pub mod store;

pub use persistence::{
    FileSessionPersistence, MemoryPersistence, PersistedSession, SessionIoError,
    SessionPersistence,
};
pub use store::{Session, SessionStore};
