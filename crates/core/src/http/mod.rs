//! Request/response representation consumed by authenticators.
//!
//! The types here are deliberately framework-agnostic: the server crate
//! converts incoming axum requests into an [`AuthRequest`] and applies the
//! headers collected in an [`AuthResponse`] back onto the outgoing response.

mod cookie;
mod request;
mod response;

pub use cookie::*;
pub use request::*;
pub use response::*;
