//! Domain entities representing issued tokens and their store records.

pub mod token;

// Re-export commonly used types
pub use token::{Claims, RefreshTokenRecord, RevocationEntry, TokenPair};
