//! Value objects representing immutable domain concepts.

pub mod rotation;

// Re-export commonly used types
pub use rotation::{RejectReason, RotationOutcome};
