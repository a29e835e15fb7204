// Middleware - request-scoped CORS policy

pub mod cors;

pub use cors::cors_middleware;
