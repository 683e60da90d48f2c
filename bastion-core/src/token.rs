//! Bearer tokens issued after a successful login.
//!
//! Tokens are stateless JWTs carrying the principal's username and granted
//! authorities. They are self-expiring; nothing is stored server-side.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Principal,
    error::{TokenError, ValidationError},
};

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "bastion";

/// Token type reported alongside every issued token.
pub const BEARER: &str = "Bearer";

/// JWT claims for login tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject - the username
    pub sub: String,
    /// Granted authorities, e.g. `ROLE_ADMIN`
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    pub iss: String,
}

/// JWT algorithm type
#[derive(Clone)]
pub enum JwtAlgorithm {
    /// RS256 - RSA with SHA-256
    RS256 {
        /// Private key for signing JWTs (PEM format)
        private_key: Vec<u8>,
        /// Public key for verifying JWTs (PEM format)
        public_key: Vec<u8>,
    },
    /// HS256 - HMAC with SHA-256
    HS256 {
        /// Secret key for both signing and verifying
        secret_key: Vec<u8>,
    },
}

impl std::fmt::Debug for JwtAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtAlgorithm::RS256 { .. } => f.write_str("RS256"),
            JwtAlgorithm::HS256 { .. } => f.write_str("HS256"),
        }
    }
}

/// Configuration for issued tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Algorithm and keys for JWT
    pub algorithm: JwtAlgorithm,
    /// Issuer claim, checked on verification
    pub issuer: String,
    /// How long an issued token stays valid
    pub lifetime: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration with RS256 algorithm
    pub fn new_rs256(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self::with_algorithm(JwtAlgorithm::RS256 {
            private_key,
            public_key,
        })
    }

    /// Create a new JWT configuration with HS256 algorithm
    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self::with_algorithm(JwtAlgorithm::HS256 { secret_key })
    }

    fn with_algorithm(algorithm: JwtAlgorithm) -> Self {
        Self {
            algorithm,
            issuer: DEFAULT_ISSUER.to_string(),
            lifetime: Duration::minutes(1440),
        }
    }

    /// Create a new JWT configuration from RSA key files (PEM format)
    pub fn from_rs256_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        use std::fs::read;

        let private_key = read(private_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read private key file: {e}"))
        })?;

        let public_key = read(public_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read public key file: {e}"))
        })?;

        Ok(Self::new_rs256(private_key, public_key))
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Get the algorithm to use with jsonwebtoken
    pub fn jwt_algorithm(&self) -> Algorithm {
        match &self.algorithm {
            JwtAlgorithm::RS256 { .. } => Algorithm::RS256,
            JwtAlgorithm::HS256 { .. } => Algorithm::HS256,
        }
    }

    /// Get the encoding key for signing
    pub fn get_encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { private_key, .. } => EncodingKey::from_rsa_pem(private_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA private key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(EncodingKey::from_secret(secret_key)),
        }
    }

    /// Get the decoding key for verification
    pub fn get_decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { public_key, .. } => DecodingKey::from_rsa_pem(public_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA public key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(DecodingKey::from_secret(secret_key)),
        }
    }

    /// Get the validation configuration for JWT verification
    pub fn get_validation(&self) -> Validation {
        let mut validation = Validation::new(self.jwt_algorithm());
        validation.set_issuer(&[self.issuer.as_str()]);
        validation
    }
}

/// A signed token handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Mints a token for an authenticated principal.
pub trait TokenIssuer: Send + Sync + 'static {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, Error>;
}

/// Issues and verifies JWTs from a [`JwtConfig`].
#[derive(Debug, Clone)]
pub struct JwtTokenIssuer {
    config: JwtConfig,
}

impl JwtTokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn encode(&self, claims: &JwtClaims) -> Result<String, Error> {
        let header = Header::new(self.config.jwt_algorithm());
        let encoding_key = self.config.get_encoding_key()?;

        encode(&header, claims, &encoding_key)
            .map_err(|e| TokenError::Signing(format!("Failed to encode JWT: {e}")).into())
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, Error> {
        let decoding_key = self.config.get_decoding_key()?;
        let validation = self.config.get_validation();

        let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Verification(format!("JWT validation failed: {e}")),
            }
        })?;

        Ok(token_data.claims)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, Error> {
        let now = Utc::now();
        let expires_at = now + self.config.lifetime;

        let claims = JwtClaims {
            sub: principal.username().to_string(),
            roles: principal.granted_authorities(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
        };

        Ok(IssuedToken {
            token: self.encode(&claims)?,
            token_type: BEARER,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_HS256_SECRET: &[u8] = b"test_secret_key_for_hs256_jwt_tokens_not_for_production_use";

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()))
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let principal = Principal::new("alice", ["ADMIN", "USER"]);

        let issued = issuer.issue(&principal).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert!(issued.expires_at > Utc::now() + Duration::minutes(1439));

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.roles, vec!["ROLE_ADMIN", "ROLE_USER"]);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let issued = issuer()
            .issue(&Principal::new("alice", ["USER"]))
            .unwrap();

        let other = JwtTokenIssuer::new(JwtConfig::new_hs256(b"another-secret".to_vec()));
        let result = other.verify(&issued.token);
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::Verification(_)))
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_issuer() {
        let issued = issuer()
            .issue(&Principal::new("alice", ["USER"]))
            .unwrap();

        let other = JwtTokenIssuer::new(
            JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()).with_issuer("someone-else"),
        );
        assert!(other.verify(&issued.token).is_err());
    }

    #[test]
    fn test_verify_expired() {
        let issuer = issuer();
        let now = Utc::now();
        let claims = JwtClaims {
            sub: "alice".to_string(),
            roles: vec![],
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            iss: DEFAULT_ISSUER.to_string(),
        };
        let token = issuer.encode(&claims).unwrap();

        assert!(matches!(
            issuer.verify(&token),
            Err(Error::Token(TokenError::Expired))
        ));
    }

    #[test]
    fn test_invalid_rsa_key() {
        let issuer = JwtTokenIssuer::new(JwtConfig::new_rs256(b"nope".to_vec(), b"nope".to_vec()));
        let result = issuer.issue(&Principal::new("alice", ["USER"]));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let config = JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec());
        let debug = format!("{config:?}");
        assert!(debug.contains("HS256"));
        assert!(!debug.contains("test_secret_key"));
    }
}
