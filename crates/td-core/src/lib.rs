//! td-core: stable foundation for tickdrive.
//!
//! Contains:
//! - units (uom SI types + constructors + time calculus over typed scalars)
//! - numeric (Real + float helpers)
//! - ids (compact IDs for signal nodes and tick-source owners)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TdError, TdResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
