//! Main token service implementation

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::domain::entities::token::{Claims, RefreshTokenRecord, RevocationEntry, TokenPair};
use crate::domain::value_objects::rotation::{RejectReason, RotationOutcome};
use crate::errors::{DomainError, TokenError};
use crate::repositories::TokenStore;

use super::config::TokenServiceConfig;
use super::key_manager::SigningCredential;

/// Random bytes per refresh token
const REFRESH_TOKEN_BYTES: usize = 32;

/// Attempts at generating an unused refresh token value
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Service issuing, rotating and revoking tokens
///
/// Access tokens are minted without touching the store. Refresh tokens are
/// only handed out once their record has been written.
pub struct TokenService<S: TokenStore> {
    pub(crate) store: S,
    config: TokenServiceConfig,
    credential: SigningCredential,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl<S: TokenStore> TokenService<S> {
    /// Creates a new token service using the system clock
    ///
    /// # Arguments
    ///
    /// * `store` - Refresh token and revocation store
    /// * `config` - Token service configuration
    ///
    /// # Returns
    ///
    /// The service, or a configuration error if no signing credential is
    /// configured or the lifetimes are invalid
    pub fn new(store: S, config: TokenServiceConfig) -> Result<Self, DomainError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a new token service reading time from `clock`
    pub fn with_clock(
        store: S,
        config: TokenServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let credential = config
            .credential
            .clone()
            .ok_or(DomainError::Token(TokenError::MissingSigningKey))?;

        // Expiry and not-before are checked against the service clock
        let mut validation = Validation::new(credential.algorithm());
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Ok(Self {
            store,
            config,
            credential,
            validation,
            clock,
        })
    }

    /// Service configuration
    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issues a signed access token
    ///
    /// # Arguments
    ///
    /// * `subject` - Identity the token is issued to, must not be empty
    /// * `roles` - Role claims, order-insensitive, duplicates collapse
    /// * `expiration` - Lifetime, defaults to the configured access lifetime
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The compact JWT
    /// * `Err(DomainError)` - Empty subject, lifetime not positive or out of range,
    ///   or signing failure
    pub fn issue_access_token(
        &self,
        subject: &str,
        roles: &[&str],
        expiration: Option<Duration>,
    ) -> Result<String, DomainError> {
        validate_subject(subject)?;
        let lifetime = self.lifetime(expiration, self.config.access_token_expiry)?;
        let now = self.clock.now();
        let expires_at = expiry_after(now, lifetime)?;

        let claims = Claims::new_access_token(
            subject,
            roles.iter().copied(),
            &self.config.issuer,
            &self.config.audience,
            now,
            expires_at,
        );
        let token = self.encode_jwt(&claims)?;

        info!(
            subject = %claims.sub,
            jti = %claims.jti,
            roles = claims.roles.len(),
            expires_at = claims.exp,
            "Access token issued"
        );

        Ok(token)
    }

    /// Issues an opaque refresh token and records it in the store
    ///
    /// The value is regenerated if the store reports a collision. No token is
    /// returned unless its record was written.
    ///
    /// # Arguments
    ///
    /// * `subject` - Identity the token is bound to, must not be empty
    /// * `expiration` - Lifetime, defaults to the configured refresh lifetime
    pub async fn issue_refresh_token(
        &self,
        subject: &str,
        expiration: Option<Duration>,
    ) -> Result<String, DomainError> {
        validate_subject(subject)?;
        let lifetime = self.lifetime(expiration, self.config.refresh_token_expiry)?;
        let now = self.clock.now();
        let expires_at = expiry_after(now, lifetime)?;

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = generate_refresh_value();
            let token_hash = Self::hash_token(&token);
            let fingerprint = fingerprint(&token_hash).to_string();
            let record = RefreshTokenRecord::new(token_hash, subject, now, expires_at);

            match self.store.put(record).await {
                Ok(()) => {
                    info!(
                        subject,
                        token = %fingerprint,
                        expires_at = %expires_at,
                        "Refresh token issued"
                    );
                    return Ok(token);
                }
                Err(DomainError::Conflict { .. }) => {
                    warn!(subject, attempt, "Refresh token collision, regenerating");
                }
                Err(e) => {
                    error!(subject, error = %e, "Failed to persist refresh token");
                    return Err(e);
                }
            }
        }

        Err(DomainError::Token(TokenError::TokenGenerationFailed))
    }

    /// Issues an access token and a refresh token for `subject`
    ///
    /// Not atomic: the refresh record commits independently of signing.
    pub async fn issue_token_pair(
        &self,
        subject: &str,
        roles: &[&str],
    ) -> Result<TokenPair, DomainError> {
        let access_token = self.issue_access_token(subject, roles, None)?;
        let refresh_token = self.issue_refresh_token(subject, None).await?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.config.access_token_expiry,
            self.config.refresh_token_expiry,
        ))
    }

    /// Exchanges a refresh token for a new one
    ///
    /// The presented token is removed before anything else is decided, so it
    /// is consumed whatever the outcome. Rotation is granted only when the
    /// token's expiry falls within the clock-skew window around now:
    /// `now - skew < expires_at <= now + skew`.
    ///
    /// # Returns
    ///
    /// * `Ok(RotationOutcome::Accepted)` - Replacement issued for the same subject
    /// * `Ok(RotationOutcome::Rejected)` - Caller must re-authenticate
    /// * `Err(DomainError)` - Store failure; the caller should retry later
    pub async fn rotate_refresh_token(
        &self,
        presented: &str,
    ) -> Result<RotationOutcome, DomainError> {
        let token_hash = Self::hash_token(presented);

        let record = match self.store.take_and_remove(&token_hash).await? {
            Some(record) => record,
            None => {
                debug!(
                    token = %fingerprint(&token_hash),
                    "Rotation rejected: unknown refresh token"
                );
                return Ok(RotationOutcome::Rejected(RejectReason::Unknown));
            }
        };

        let now = self.clock.now();
        let skew = self.config.clock_skew;

        if record.is_lapsed(now, skew) {
            info!(
                subject = %record.subject,
                expired_at = %record.expires_at,
                "Rotation rejected: refresh token expired"
            );
            return Ok(RotationOutcome::Rejected(RejectReason::Expired));
        }

        if !record.is_within_rotation_window(now, skew) {
            info!(
                subject = %record.subject,
                expires_at = %record.expires_at,
                "Rotation rejected: refresh token outside rotation window, session terminated"
            );
            return Ok(RotationOutcome::Rejected(RejectReason::TooFresh));
        }

        let refresh_token = self.issue_refresh_token(&record.subject, None).await?;
        info!(subject = %record.subject, "Refresh token rotated");

        Ok(RotationOutcome::Accepted {
            subject: record.subject,
            refresh_token,
        })
    }

    /// Verifies an access token and returns its claims
    ///
    /// Checks signature, issuer, audience, expiry (with clock-skew leeway)
    /// and the revocation set.
    pub async fn verify_access_token(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token)?;
        let now = self.clock.now().timestamp();
        let leeway = self.config.clock_skew.num_seconds();

        if claims.exp.saturating_add(leeway) <= now {
            return Err(DomainError::Token(TokenError::TokenExpired));
        }
        if claims.nbf.saturating_sub(leeway) > now {
            return Err(DomainError::Token(TokenError::TokenNotYetValid));
        }
        if self.store.is_blacklisted(&claims.jti).await? {
            debug!(jti = %claims.jti, "Rejected revoked access token");
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }

        Ok(claims)
    }

    /// Blacklists an access token id
    ///
    /// The entry lives for the default access lifetime, an upper bound for
    /// tokens issued without an explicit expiration.
    pub async fn blacklist(&self, jti: &str) -> Result<(), DomainError> {
        let expires_at = expiry_after(self.clock.now(), self.config.access_token_expiry)?;
        self.blacklist_until(jti, expires_at).await
    }

    /// Blacklists an access token id until `expires_at`
    pub async fn blacklist_until(
        &self,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if jti.is_empty() {
            return Err(DomainError::Validation {
                message: "Token id must not be empty".to_string(),
            });
        }

        self.store.blacklist(RevocationEntry::new(jti, expires_at)).await?;
        info!(jti, expires_at = %expires_at, "Access token blacklisted");
        Ok(())
    }

    /// Blacklists a signed access token until its own expiry
    ///
    /// The signature is verified so that forged tokens cannot fill the
    /// revocation set; the token may already be expired.
    pub async fn blacklist_access_token(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token)?;
        let expires_at = claims
            .expires_at()
            .ok_or(DomainError::Token(TokenError::InvalidTokenFormat))?;

        self.blacklist_until(&claims.jti, expires_at).await?;
        Ok(claims)
    }

    /// Checks whether an access token id has been blacklisted
    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        self.store.is_blacklisted(jti).await
    }

    /// Removes every refresh token of `subject`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of refresh tokens removed
    pub async fn purge_subject_tokens(&self, subject: &str) -> Result<usize, DomainError> {
        let removed = self.store.purge_all_for_subject(subject).await?;
        info!(subject, removed, "Refresh tokens purged");
        Ok(removed)
    }

    /// Hashes a refresh token for storage
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Encodes claims into a JWT
    pub(crate) fn encode_jwt(&self, claims: &Claims) -> Result<String, DomainError> {
        let header = Header::new(self.credential.algorithm());
        encode(&header, claims, self.credential.encoding_key()).map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })
    }

    /// Decodes a JWT, checking signature, issuer and audience
    pub(crate) fn decode_jwt(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(token, self.credential.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                    ErrorKind::ImmatureSignature => TokenError::TokenNotYetValid,
                    _ => TokenError::InvalidTokenFormat,
                };
                DomainError::Token(err)
            })
    }

    fn lifetime(
        &self,
        requested: Option<Duration>,
        default: Duration,
    ) -> Result<Duration, DomainError> {
        let lifetime = requested.unwrap_or(default);
        if lifetime <= Duration::zero() {
            return Err(DomainError::Validation {
                message: "Token lifetime must be positive".to_string(),
            });
        }
        Ok(lifetime)
    }
}

fn validate_subject(subject: &str) -> Result<(), DomainError> {
    if subject.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "Subject must not be empty".to_string(),
        });
    }
    Ok(())
}

/// `now + lifetime`, rejecting lifetimes that leave the representable range
fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>, DomainError> {
    now.checked_add_signed(lifetime)
        .ok_or_else(|| DomainError::Validation {
            message: format!("Token lifetime of {}s is out of range", lifetime.num_seconds()),
        })
}

/// Generates a refresh token value from the OS CSPRNG
fn generate_refresh_value() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Loggable prefix of a token digest
fn fingerprint(token_hash: &str) -> &str {
    &token_hash[..token_hash.len().min(12)]
}
