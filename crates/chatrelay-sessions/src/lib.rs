//! `chatrelay-sessions`: in-memory, expiry-bounded conversation context.
//!
//! Each user identity maps to the ordered turns exchanged so far. Entries
//! are overwritten whole on every write and vanish once the inactivity
//! window elapses, either lazily on read or via [`SessionSweeper`].

pub mod store;
pub mod sweeper;

pub use store::SessionStore;
pub use sweeper::SessionSweeper;
