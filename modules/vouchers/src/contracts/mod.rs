//! Versioned request/response types for the vouchers HTTP API
//!
//! Field names here are part of the wire contract. Changing one is a
//! breaking change; add a new version module instead.

pub mod managers_v1;
pub mod recharges_v1;
pub mod resellers_v1;
pub mod tokens_v1;
pub mod vouchers_v1;

pub use managers_v1::*;
pub use recharges_v1::*;
pub use resellers_v1::*;
pub use tokens_v1::*;
pub use vouchers_v1::*;
