//! Token entities for access/refresh token issuance.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims structure for the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (caller identity)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID, the revocation handle
    pub jti: String,

    /// Role claims, passed through opaquely
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<String>,
}

impl Claims {
    /// Creates claims for a new access token
    ///
    /// # Arguments
    ///
    /// * `subject` - Identity the token is issued to
    /// * `roles` - Role strings; order and duplicates are irrelevant
    /// * `issuer` / `audience` - Configured `iss` and `aud` values
    /// * `issued_at` - Current time according to the service clock
    /// * `expires_at` - Value of `exp`
    pub fn new_access_token<I, S>(
        subject: &str,
        roles: I,
        issuer: &str,
        audience: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            nbf: issued_at.timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            jti: Uuid::new_v4().to_string(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks if the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Expiry as a timestamp, `None` if out of range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Whether the token carries `role`
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Refresh token record owned by the token store
///
/// The bearer value never reaches the store; records are keyed by its
/// SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Hex-encoded SHA-256 digest of the refresh token
    pub token_hash: String,

    /// Subject this token belongs to
    pub subject: String,

    /// Timestamp when the token was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Creates a new record
    pub fn new(
        token_hash: impl Into<String>,
        subject: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_hash: token_hash.into(),
            subject: subject.into(),
            created_at,
            expires_at,
        }
    }

    /// Checks if the record has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time remaining until expiration, zero if already expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Whether the expiry falls on or before `now + skew`
    ///
    /// A window reaching past the representable range contains every expiry.
    pub fn is_within_rotation_window(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now.checked_add_signed(skew)
            .map_or(true, |limit| self.expires_at <= limit)
    }

    /// Whether the expiry lies further in the past than `skew`
    pub fn is_lapsed(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at
            .checked_add_signed(skew)
            .map_or(false, |limit| limit <= now)
    }
}

/// Blacklisted access token id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// JWT ID of the revoked access token
    pub jti: String,

    /// Expiry of the revoked token; the entry is collectable afterwards
    pub expires_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn new(jti: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            jti: jti.into(),
            expires_at,
        }
    }

    /// Checks if the entry outlived the token it revokes
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,

    /// Opaque refresh token
    pub refresh_token: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_in: access_lifetime.num_seconds(),
            refresh_expires_in: refresh_lifetime.num_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "tokenward";
    const AUDIENCE: &str = "tokenward-api";

    #[test]
    fn test_access_token_claims() {
        let now = Utc::now();
        let claims = Claims::new_access_token(
            "alice",
            ["writer", "reader", "writer"],
            ISSUER,
            AUDIENCE,
            now,
            now + Duration::minutes(15),
        );

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.roles.len(), 2);
        assert!(claims.has_role("reader"));
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::minutes(15)));
    }

    #[test]
    fn test_empty_roles_are_omitted_on_the_wire() {
        let now = Utc::now();
        let claims = Claims::new_access_token(
            "bob",
            Vec::<String>::new(),
            ISSUER,
            AUDIENCE,
            now,
            now + Duration::minutes(5),
        );

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("roles").is_none());

        let decoded: Claims = serde_json::from_value(json).unwrap();
        assert!(decoded.roles.is_empty());
    }

    #[test]
    fn test_jti_is_unique() {
        let now = Utc::now();
        let exp = now + Duration::minutes(1);
        let a = Claims::new_access_token("s", ["r"], ISSUER, AUDIENCE, now, exp);
        let b = Claims::new_access_token("s", ["r"], ISSUER, AUDIENCE, now, exp);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_refresh_record_rotation_window() {
        let now = Utc::now();
        let skew = Duration::minutes(1);
        let record = RefreshTokenRecord::new("hash", "alice", now, now + Duration::minutes(10));

        assert!(!record.is_within_rotation_window(now, skew));
        assert!(record.is_within_rotation_window(now + Duration::seconds(570), skew));
        assert!(record.is_within_rotation_window(now + Duration::minutes(9), skew));
        assert!(!record.is_lapsed(now + Duration::minutes(10), skew));
        assert!(record.is_lapsed(now + Duration::minutes(11), skew));
    }

    #[test]
    fn test_rotation_window_at_range_limits() {
        let now = Utc::now();
        let record = RefreshTokenRecord::new("hash", "alice", now, DateTime::<Utc>::MAX_UTC);

        assert!(record.is_within_rotation_window(now, Duration::MAX));
        assert!(!record.is_lapsed(now, Duration::MAX));
        assert!(!record.is_lapsed(DateTime::<Utc>::MAX_UTC, Duration::minutes(1)));
    }

    #[test]
    fn test_refresh_record_time_until_expiration() {
        let now = Utc::now();
        let record = RefreshTokenRecord::new("hash", "alice", now, now + Duration::days(7));

        assert_eq!(record.time_until_expiration(now), Duration::days(7));
        assert_eq!(
            record.time_until_expiration(now + Duration::days(8)),
            Duration::zero()
        );
        assert!(record.is_expired_at(now + Duration::days(7)));
    }

    #[test]
    fn test_revocation_entry_expiry() {
        let now = Utc::now();
        let entry = RevocationEntry::new("jti-1", now + Duration::minutes(15));
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::minutes(15)));
    }

    #[test]
    fn test_token_pair_creation() {
        let pair = TokenPair::new(
            "access".to_string(),
            "refresh".to_string(),
            Duration::minutes(15),
            Duration::days(7),
        );

        assert_eq!(pair.access_expires_in, 15 * 60);
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 60 * 60);
    }
}
