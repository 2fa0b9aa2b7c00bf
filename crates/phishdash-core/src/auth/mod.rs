//! Authentication module for managing the client session and credentials.
//!
//! This module provides:
//! - `Session`: the token store (token, username, admin flag) and the
//!   default `Authorization` header derived from it
//! - `header`: bearer header construction and default-header merging
//! - `CredentialStore`: optional OS-level password storage via keyring
//!
//! Session state is persisted through a `KeyValueStore` so a token issued
//! in one run is picked up by the next.

pub mod credentials;
pub mod header;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionSnapshot, SessionState};
