//! HTTP middleware components.
//!
//! Middleware run before route handlers and can short-circuit a request
//! (e.g. reject an unsigned one) before the handler sees it.

/// Shared-secret request signature middleware
pub mod signature;
