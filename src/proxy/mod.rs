// proxy module - session-bridging reverse proxy

pub mod cookie_policy;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod session;
pub mod tasks;
pub mod upstream;

pub use error::BridgeError;
pub use server::{AppState, AxumServer};
pub use tasks::DetachedTasks;

/// Name of the cookie carrying the opaque session identifier.
/// The value is a proxy-minted lookup key, never the upstream credential.
pub const SESSION_COOKIE_NAME: &str = "feedbridge_session";
