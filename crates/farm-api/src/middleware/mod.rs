//! HTTP middleware for the API unit.

pub mod body_limit;
pub mod identity;

pub use body_limit::validate_content_length;
pub use identity::attach_requester;
