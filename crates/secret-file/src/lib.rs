//! Ephemeral secret files
//!
//! Writes a secret to disk for the duration of a CI job and deletes it at
//! teardown.

pub mod action;
pub mod secret;
pub mod store;

pub use action::{SecretFileAction, FILE_PATH_INPUT, FILE_PATH_KEY, SECRET_INPUT, TYPE_INPUT};
pub use secret::SecretType;
pub use store::{FsSecretFiles, SecretFileError, SecretFileLib};
