pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::{AuthContext, AuthUser, ClearIdentity};
pub use routes::create_router;
