//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Security (CORS, security headers, body limits)
//! - Observability (tracing spans, request IDs)
//! - Recovery (panics, timeouts, service errors)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::Router;
//! use contree_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_default_security()
//!     .with_default_recovery()
//!     .with_observability();
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{BodyLimitConfig, CorsConfig, DEFAULT_MAX_BODY_SIZE, RouterSecurityExt};
