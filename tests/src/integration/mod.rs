//! Cross-crate integration flows.

pub mod install_flow;
