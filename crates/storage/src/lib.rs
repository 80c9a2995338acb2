//! Storage abstraction and implementations for UpNext.
//!
//! This crate provides a trait-based storage interface with an in-memory
//! and a JSON file implementation, plus the per-learner lock table used to
//! serialize read-modify-write cycles.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;
#[cfg(feature = "json")]
pub mod json_storage;
pub mod lock;

pub use trait_::{NotificationFilter, NotificationUpdate, Result, Storage, StorageError};
pub use memory::MemoryStorage;
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
pub use lock::UserLocks;
