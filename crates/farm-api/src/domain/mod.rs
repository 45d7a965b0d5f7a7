//! Domain layer: configuration, the install outcome taxonomy, and the
//! transaction correlator.

pub mod config;
pub mod error;
pub mod transaction;
