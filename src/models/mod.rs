//! Data models representing database entities and API payloads.

/// Page arithmetic for list endpoints
pub mod pagination;
/// Loyalty point model and derivation rule
pub mod point;
/// Transaction model, validation and list query types
pub mod transaction;
