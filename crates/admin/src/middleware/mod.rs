//! HTTP middleware stack for the admin app.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler with the [`RequireShop`] extractor.

pub mod auth;
pub mod session;

pub use auth::{CurrentShop, RequireShop, ShopAuthRejection};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, create_session_store};
