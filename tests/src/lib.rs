//! # Farmgate Test Suite
//!
//! Unified test crate for flows that cross crate boundaries:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── correlation.rs   # Bus + router + correlator lifecycle
//!     └── install_flow.rs  # Full HTTP install scenarios
//! ```
//!
//! Single-crate behavior is tested inside each crate; this suite only
//! exercises the assembled unit.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p farmgate-tests
//! cargo test -p farmgate-tests integration::correlation
//! cargo test -p farmgate-tests integration::install_flow
//! ```

#[cfg(test)]
pub mod integration;
