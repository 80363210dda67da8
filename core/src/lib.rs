//! # Tokenward Core
//!
//! Token lifecycle logic: issuing signed access tokens and opaque refresh
//! tokens, single-use refresh rotation under a clock-skew window, and the
//! access-token revocation set. Persistence sits behind the
//! [`repositories::TokenStore`] contract.

pub mod clock;
pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    Claims, RefreshTokenRecord, RejectReason, RevocationEntry, RotationOutcome, TokenPair,
};
pub use errors::{DomainError, DomainResult, TokenError};
pub use repositories::{InMemoryTokenStore, TokenStore};
pub use services::{
    CleanupResult, SigningCredential, TokenCleanupConfig, TokenCleanupService, TokenService,
    TokenServiceConfig,
};
