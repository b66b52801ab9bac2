// src/validator.rs

use crate::config::Config;
use crate::error::AuthError;
use crate::identity::Claims;
use crate::jwks::JwksCache;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use tracing::instrument;

/// The main bearer-token validator.
///
/// This struct is initialized with a `Config` and should be created once and
/// reused for all validation requests. It owns the JWKS cache and performs
/// all validation steps: header parsing, key resolution, signature
/// verification and claim rules.
#[derive(Clone)]
pub struct Validator {
    config: Config,
    jwks: JwksCache,
}

impl Validator {
    /// Creates a new `Validator` with the given configuration.
    ///
    /// A preloaded key set in the config is installed into the cache here, so
    /// deployments without outbound network access can validate tokens from
    /// the first request.
    pub fn new(config: Config) -> Self {
        let jwks = JwksCache::new(&config);
        Self { config, jwks }
    }

    /// Validates a bearer token and returns its claims.
    ///
    /// The pipeline runs in a fixed order and stops at the first failing
    /// rule; no step is retried within one call:
    ///
    /// 1. Header: an RSA-family algorithm and a `kid` are required.
    /// 2. Key resolution via the JWKS cache, with one lazy refresh on a miss.
    /// 3. Signature verification and the expiry check (expiry is reported in
    ///    preference to the rules below).
    /// 4. Claim rules: exact issuer match, `token_use` of `"access"` or
    ///    `"id"`, then the client ID against `client_id` (access tokens) or
    ///    `aud` (ID tokens).
    ///
    /// Dropping the returned future cancels an in-flight key fetch.
    #[instrument(skip(self, token), err)]
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let header =
            decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;

        if !matches!(
            header.alg,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let key = self.jwks.lookup(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.config.leeway.as_secs();
        // Issuer and audience are checked by the rules below; jsonwebtoken
        // only verifies the signature and the expiry here.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let token_data =
            decode::<Claims>(token, &key, &validation).map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken(err.to_string()),
            })?;
        let claims = token_data.claims;

        // jsonwebtoken only rejects `exp < now`; Cognito requires the expiry
        // to be strictly in the future, so `exp == now` is already expired.
        if claims.exp <= Utc::now().timestamp() - self.config.leeway.as_secs() as i64 {
            return Err(AuthError::ExpiredToken);
        }

        if claims.iss != self.config.issuer_url.as_str() {
            return Err(AuthError::InvalidIssuer);
        }

        match claims.token_use.as_str() {
            "access" => {
                if claims.client_id.as_deref() != Some(self.config.client_id.as_str()) {
                    return Err(AuthError::InvalidAudience);
                }
            }
            "id" => {
                if claims.aud.as_deref() != Some(self.config.client_id.as_str()) {
                    return Err(AuthError::InvalidAudience);
                }
            }
            _ => return Err(AuthError::InvalidTokenUse),
        }

        Ok(claims)
    }

    /// Forces an immediate refresh of the JWKS cache, for operational use
    /// (e.g. manual key-rotation recovery). On failure the previous cache
    /// contents are retained unchanged.
    #[instrument(skip(self), err)]
    pub async fn refresh_jwks(&self) -> Result<(), AuthError> {
        self.jwks.refresh().await
    }

    /// The configuration this validator was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
