//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Rate limiting on `POST /api/auth/login` (governor)
//!
//! Authentication is not a layer: handlers that need a caller take the
//! [`RequireAuth`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAuth;
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
