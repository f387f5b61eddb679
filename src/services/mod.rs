//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and request signatures.

pub mod signature_service;
pub mod transaction_service;
