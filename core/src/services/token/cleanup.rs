//! Garbage collection of expired refresh tokens and blacklist entries
//!
//! Expired records are already unusable; sweeping them only bounds storage.
//! The sweep runs when the host calls [`TokenCleanupService::run_cleanup`],
//! for instance from the `tokenward-sweep` maintenance binary.

use std::sync::Arc;

use chrono::Duration;
use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::errors::DomainError;
use crate::repositories::TokenStore;

/// Configuration for the cleanup sweep
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How long past expiry a record is kept
    ///
    /// Should be at least the rotation clock skew, since a refresh token
    /// that expired less than one skew ago can still be rotated.
    pub grace_period: Duration,
    /// Whether sweeping is enabled
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::seconds(60),
            enabled: true,
        }
    }
}

impl TokenCleanupConfig {
    /// Configuration keeping records for one clock skew past expiry
    pub fn for_clock_skew(skew: Duration) -> Self {
        Self {
            grace_period: skew,
            ..Default::default()
        }
    }
}

/// Service sweeping expired refresh tokens and blacklist entries
pub struct TokenCleanupService<S: TokenStore> {
    store: S,
    config: TokenCleanupConfig,
    clock: Arc<dyn Clock>,
}

impl<S: TokenStore> TokenCleanupService<S> {
    /// Create a new cleanup service
    pub fn new(store: S, config: TokenCleanupConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a new cleanup service reading time from `clock`
    pub fn with_clock(store: S, config: TokenCleanupConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    /// Run a single cleanup cycle
    ///
    /// A failure in one sweep is recorded in the result and does not stop
    /// the other.
    pub async fn run_cleanup(&self) -> Result<CleanupResult, DomainError> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(self.config.grace_period)
            .ok_or_else(|| DomainError::Configuration {
                message: "Cleanup grace period is out of range".to_string(),
            })?;
        let mut result = CleanupResult::default();

        match self.store.delete_expired_tokens(cutoff).await {
            Ok(count) => result.expired_tokens_deleted = count,
            Err(e) => {
                error!("Failed to cleanup expired tokens: {}", e);
                result.errors.push(format!("Token cleanup error: {}", e));
            }
        }

        match self.store.cleanup_blacklist(cutoff).await {
            Ok(count) => result.blacklist_entries_deleted = count,
            Err(e) => {
                error!("Failed to cleanup blacklist: {}", e);
                result.errors.push(format!("Blacklist cleanup error: {}", e));
            }
        }

        info!(
            expired_tokens = result.expired_tokens_deleted,
            blacklist_entries = result.blacklist_entries_deleted,
            errors = result.errors.len(),
            "Token cleanup completed"
        );

        Ok(result)
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired refresh tokens deleted
    pub expired_tokens_deleted: usize,
    /// Number of expired blacklist entries deleted
    pub blacklist_entries_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get total number of items cleaned up
    pub fn total_cleaned(&self) -> usize {
        self.expired_tokens_deleted + self.blacklist_entries_deleted
    }
}
