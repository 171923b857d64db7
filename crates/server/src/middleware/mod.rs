//! HTTP middleware stack for the Shelfwise API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting on `/auth/login` and `/auth/register` (governor)
//!
//! Authorization is not a layer: handlers declare it through the
//! [`Authenticated`] and [`Authorized`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{Authenticated, Authorized, clear_current_user, set_current_user};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
