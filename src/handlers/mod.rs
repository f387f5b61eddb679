//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string)
//! 2. Calls into the services layer
//! 3. Returns HTTP response (JSON, status code)

/// Service health check
pub mod health;
/// Transaction create, list and seed endpoints
pub mod transactions;
