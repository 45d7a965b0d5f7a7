//! # Shared Types Crate
//!
//! Core domain types shared across farmgate units: bus channel addresses,
//! device records, and requester identity.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cross-unit types are defined here, leaf-level,
//!   with no async machinery.
//! - **Opaque Addressing**: A [`Channel`] is the only way to name a bus
//!   destination; transaction reply channels carry a reserved prefix so they
//!   can never collide with device-addressed traffic.

pub mod channel;
pub mod device;

pub use channel::Channel;
pub use device::{Device, Requester};
