//! Durable key-value storage
//!
//! Small named partitions of JSON values: the chosen folder, user
//! preferences and the last device selection.

pub mod kv;
pub mod preferences;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, Partition};
