// src/error.rs

use thiserror::Error;

/// The primary error type for the `cognito-guard` library.
///
/// Every failure mode of token validation surfaces as a distinct variant;
/// validation never panics.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(&'static str),

    /// The token is structurally invalid: not a JWT, undecodable segments, or
    /// a required claim is absent or of the wrong type.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("The JWT header is missing the 'kid' (Key ID) field")]
    MissingKeyId,

    #[error("Unsupported JWT signing algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    /// The signing key could not be resolved, even after one refresh attempt.
    /// When the refresh itself failed, the fetch error is attached as source.
    #[error("Signing key not found for kid: {kid}")]
    KeyNotFound {
        kid: String,
        #[source]
        source: Option<Box<AuthError>>,
    },

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Invalid token_use claim")]
    InvalidTokenUse,

    #[error("Invalid token audience")]
    InvalidAudience,

    #[error("Failed to fetch JWKS: {0}")]
    JwksFetch(#[from] reqwest::Error),

    #[error("Invalid JWK format: {0}")]
    InvalidKeyFormat(String),
}
