/// Middleware modules for the API server
///
/// - `security`: Security response headers
///
/// Authentication is applied per route group in [`crate::app`].

pub mod security;
