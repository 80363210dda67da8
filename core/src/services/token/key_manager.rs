//! Signing credential management for access tokens

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use tw_shared::config::JwtConfig;

use crate::errors::{DomainError, TokenError};

/// Where the key material came from
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeySource {
    Secret,
    Files { private_key: PathBuf, public_key: PathBuf },
    Memory,
}

/// Key material and algorithm used to sign and verify access tokens
#[derive(Clone)]
pub struct SigningCredential {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    source: KeySource,
}

impl std::fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredential")
            .field("algorithm", &self.algorithm)
            .field("source", &self.source)
            .finish()
    }
}

impl SigningCredential {
    /// Creates an HMAC credential from a shared secret
    ///
    /// # Arguments
    ///
    /// * `secret` - Shared secret, must not be empty
    /// * `algorithm` - One of HS256, HS384 or HS512
    pub fn hmac(secret: &[u8], algorithm: Algorithm) -> Result<Self, DomainError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(DomainError::Configuration {
                message: format!("{:?} is not an HMAC algorithm", algorithm),
            });
        }
        if secret.is_empty() {
            return Err(DomainError::Token(TokenError::MissingSigningKey));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            source: KeySource::Secret,
        })
    }

    /// Creates an HS256 credential from a shared secret
    pub fn hs256(secret: impl AsRef<[u8]>) -> Result<Self, DomainError> {
        Self::hmac(secret.as_ref(), Algorithm::HS256)
    }

    /// Creates an RSA credential from PEM key files
    ///
    /// # Example
    ///
    /// ```no_run
    /// use jsonwebtoken::Algorithm;
    /// use tw_core::services::token::SigningCredential;
    ///
    /// let credential = SigningCredential::rsa_from_files(
    ///     "keys/jwt_private_key.pem",
    ///     "keys/jwt_public_key.pem",
    ///     Algorithm::RS256,
    /// ).expect("Failed to load keys");
    /// ```
    pub fn rsa_from_files<P: AsRef<Path>>(
        private_key_path: P,
        public_key_path: P,
        algorithm: Algorithm,
    ) -> Result<Self, DomainError> {
        let private_key = private_key_path.as_ref().to_path_buf();
        let public_key = public_key_path.as_ref().to_path_buf();

        let private_key_pem =
            fs::read(&private_key).map_err(|e| key_error("read private key", e))?;
        let public_key_pem = fs::read(&public_key).map_err(|e| key_error("read public key", e))?;

        let mut credential =
            Self::rsa_from_pem_bytes(&private_key_pem, &public_key_pem, algorithm)?;
        credential.source = KeySource::Files { private_key, public_key };
        Ok(credential)
    }

    /// Creates an RSA credential from PEM strings
    pub fn rsa_from_pem(
        private_key_pem: &str,
        public_key_pem: &str,
        algorithm: Algorithm,
    ) -> Result<Self, DomainError> {
        Self::rsa_from_pem_bytes(private_key_pem.as_bytes(), public_key_pem.as_bytes(), algorithm)
    }

    fn rsa_from_pem_bytes(
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        algorithm: Algorithm,
    ) -> Result<Self, DomainError> {
        if !matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ) {
            return Err(DomainError::Configuration {
                message: format!("{:?} is not an RSA algorithm", algorithm),
            });
        }

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| key_error("parse private key", e))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| key_error("parse public key", e))?;

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            source: KeySource::Memory,
        })
    }

    /// Builds the credential described by `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(credential))` - Key material was configured and loaded
    /// * `Ok(None)` - No key material configured
    /// * `Err(DomainError)` - Unknown algorithm or unreadable keys
    pub fn from_jwt_config(config: &JwtConfig) -> Result<Option<Self>, DomainError> {
        let algorithm = Algorithm::from_str(&config.algorithm.to_ascii_uppercase()).map_err(|_| {
            DomainError::Configuration {
                message: format!("Unsupported signing algorithm: {}", config.algorithm),
            }
        })?;

        let uses_pss = matches!(algorithm, Algorithm::PS256 | Algorithm::PS384 | Algorithm::PS512);
        if config.uses_rsa() || uses_pss {
            return match (&config.private_key_path, &config.public_key_path) {
                (Some(private_key), Some(public_key)) => {
                    Self::rsa_from_files(private_key, public_key, algorithm).map(Some)
                }
                _ => Ok(None),
            };
        }

        match config.secret.as_deref() {
            Some(secret) if !secret.is_empty() => {
                Self::hmac(secret.as_bytes(), algorithm).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Signing algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key used to sign tokens
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Key used to verify tokens
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Paths of the PEM files, if the credential was loaded from disk
    pub fn key_paths(&self) -> Option<(&Path, &Path)> {
        match &self.source {
            KeySource::Files { private_key, public_key } => Some((private_key, public_key)),
            _ => None,
        }
    }
}

fn key_error(action: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::Token(TokenError::KeyLoadError {
        message: format!("Failed to {}: {}", action, err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_requires_secret() {
        let err = SigningCredential::hs256("").unwrap_err();
        assert!(matches!(err, DomainError::Token(TokenError::MissingSigningKey)));
    }

    #[test]
    fn test_hmac_rejects_rsa_algorithm() {
        let err = SigningCredential::hmac(b"secret", Algorithm::RS256).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_rsa_rejects_garbage_pem() {
        let err = SigningCredential::rsa_from_pem("not a key", "not a key", Algorithm::RS256)
            .unwrap_err();
        assert!(matches!(err, DomainError::Token(TokenError::KeyLoadError { .. })));
    }

    #[test]
    fn test_rsa_missing_files() {
        let err = SigningCredential::rsa_from_files(
            "/nonexistent/private.pem",
            "/nonexistent/public.pem",
            Algorithm::RS256,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_jwt_config() {
        let config = JwtConfig::new("development-secret");
        let credential = SigningCredential::from_jwt_config(&config).unwrap().unwrap();
        assert_eq!(credential.algorithm(), Algorithm::HS256);
        assert!(credential.key_paths().is_none());

        let unconfigured = JwtConfig::default();
        assert!(SigningCredential::from_jwt_config(&unconfigured).unwrap().is_none());

        let mut rsa_without_keys = JwtConfig::default();
        rsa_without_keys.algorithm = "RS256".to_string();
        assert!(SigningCredential::from_jwt_config(&rsa_without_keys).unwrap().is_none());

        let mut bogus = JwtConfig::new("secret");
        bogus.algorithm = "XY999".to_string();
        assert!(matches!(
            SigningCredential::from_jwt_config(&bogus),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let credential = SigningCredential::hs256("super-secret").unwrap();
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("HS256"));
    }
}
