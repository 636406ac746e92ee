//! Camera and microphone selection
//!
//! - key: selection keys for enumerated devices
//! - migration: upgrade of persisted raw-id selections
//! - permission: rules for requesting media access
//! - registry: the device registry service

pub mod key;
pub mod migration;
pub mod permission;
pub mod registry;

pub use key::{DeviceKind, MediaInputDevice};
pub use registry::{DeviceRegistry, DeviceSnapshot};
