//! Authentication module for managing the clinician session.
//!
//! This module provides:
//! - `CredentialStore`: durable storage of the bearer token and identity
//! - `SessionContext`: the in-memory session with `login`/`logout`
//! - `HydrationGate`: the one-shot startup load of the stored credential
//!
//! Storage backends live in `storage`: a JSON file (default), the OS
//! keychain, or memory.

pub mod credentials;
pub mod hydration;
pub mod session;
pub mod storage;

pub use credentials::{Credential, CredentialStore};
pub use hydration::{HydrationGate, HydrationState};
pub use session::SessionContext;
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};
