//! Result of presenting a refresh token for rotation.

use serde::{Deserialize, Serialize};

/// Why a refresh token was not rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Never issued, already rotated, or purged
    Unknown,
    /// Expiry lies beyond the clock-skew window; the token was consumed
    TooFresh,
    /// Expired longer ago than the clock-skew tolerance
    Expired,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Unknown => write!(f, "unknown"),
            RejectReason::TooFresh => write!(f, "too_fresh"),
            RejectReason::Expired => write!(f, "expired"),
        }
    }
}

/// Outcome of a rotation attempt
///
/// A rejection is a regular result, never an error: whatever the reason, the
/// caller holds no usable refresh token and must re-authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The presented token was consumed and replaced
    Accepted {
        subject: String,
        refresh_token: String,
    },
    /// The presented token is not (or no longer) usable
    Rejected(RejectReason),
}

impl RotationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RotationOutcome::Accepted { .. })
    }

    /// The replacement token, if rotation succeeded
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            RotationOutcome::Accepted { refresh_token, .. } => Some(refresh_token),
            RotationOutcome::Rejected(_) => None,
        }
    }

    /// The subject the token belonged to, if rotation succeeded
    pub fn subject(&self) -> Option<&str> {
        match self {
            RotationOutcome::Accepted { subject, .. } => Some(subject),
            RotationOutcome::Rejected(_) => None,
        }
    }

    /// The rejection reason, if rotation failed
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            RotationOutcome::Accepted { .. } => None,
            RotationOutcome::Rejected(reason) => Some(*reason),
        }
    }
}
