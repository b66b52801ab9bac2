// src/config.rs

use crate::error::AuthError;
use crate::model::JsonWebKeySet;
use std::time::Duration;
use url::Url;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// The main configuration for the `cognito-guard` validator.
///
/// This struct holds all necessary information to reach the user pool's JWKS
/// endpoint and validate tokens. It should be constructed using the
/// `ConfigBuilder`.
#[derive(Debug, Clone)]
pub struct Config {
    /// The issuer URL of the user pool, e.g.
    /// `https://cognito-idp.eu-west-1.amazonaws.com/{pool-id}`. Used to
    /// validate the `iss` claim by exact string comparison.
    pub issuer_url: Url,
    /// The client ID of the application, as registered with the user pool.
    /// Validated against `client_id` for access tokens and `aud` for ID tokens.
    pub client_id: String,
    /// The resolved JWKS endpoint. Defaults to
    /// `{issuer_url}/.well-known/jwks.json` unless overridden.
    pub jwks_url: Url,
    /// How long a fetched key set is trusted before the next lookup triggers a
    /// refresh. The whole cache shares one refresh timestamp.
    pub cache_ttl: Duration,
    /// Timeout applied to each JWKS fetch so a slow or unreachable provider
    /// cannot stall request processing.
    pub fetch_timeout: Duration,
    /// Clock skew tolerance for the `exp` check. Defaults to zero.
    pub leeway: Duration,
    /// An optional key set supplied out-of-band, installed at startup for
    /// deployments without outbound network access to the provider.
    pub preloaded_jwks: Option<JsonWebKeySet>,
}

/// A builder for creating a `Config` instance.
///
/// This builder provides a fluent API to ensure that the configuration is
/// constructed correctly and with all required fields.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    issuer_url: Option<Url>,
    client_id: Option<String>,
    jwks_url_override: Option<Url>,
    cache_ttl: Option<Duration>,
    fetch_timeout: Option<Duration>,
    leeway: Option<Duration>,
    preloaded_jwks: Option<JsonWebKeySet>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issuer URL of the user pool. This is a required field.
    pub fn issuer_url(mut self, url: &str) -> Result<Self, AuthError> {
        let parsed = Url::parse(url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        self.issuer_url = Some(parsed);
        Ok(self)
    }

    /// Sets the client ID of the application. This is a required field.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets an explicit JWKS endpoint, overriding the well-known path derived
    /// from the issuer URL. This is optional.
    pub fn jwks_url(mut self, url: &str) -> Result<Self, AuthError> {
        let parsed = Url::parse(url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        self.jwks_url_override = Some(parsed);
        Ok(self)
    }

    /// Sets how long fetched keys are trusted before the next lookup triggers
    /// a refresh. Defaults to one hour.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the timeout for each JWKS fetch. Defaults to 3 seconds.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the clock skew tolerance for the expiry check. Defaults to zero.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// Supplies a pre-fetched JWKS as raw JSON, installed into the cache at
    /// startup. Intended for deployments where the provider is unreachable at
    /// boot time (e.g. a VPC without a NAT gateway).
    pub fn preloaded_jwks(mut self, json: &str) -> Result<Self, AuthError> {
        let set: JsonWebKeySet = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidKeyFormat(e.to_string()))?;
        self.preloaded_jwks = Some(set);
        Ok(self)
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields (`issuer_url`, `client_id`) are
    /// missing.
    pub fn build(self) -> Result<Config, AuthError> {
        let issuer_url = self
            .issuer_url
            .ok_or(AuthError::MissingConfiguration("issuer_url"))?;
        let client_id = self
            .client_id
            .ok_or(AuthError::MissingConfiguration("client_id"))?;

        let jwks_url = match self.jwks_url_override {
            Some(url) => url,
            None => {
                let well_known = format!(
                    "{}/.well-known/jwks.json",
                    issuer_url.as_str().trim_end_matches('/')
                );
                Url::parse(&well_known).map_err(|e| AuthError::InvalidUrl(e.to_string()))?
            }
        };

        Ok(Config {
            issuer_url,
            client_id,
            jwks_url,
            cache_ttl: self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            fetch_timeout: self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            leeway: self.leeway.unwrap_or(Duration::ZERO),
            preloaded_jwks: self.preloaded_jwks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_well_known_jwks_url_from_issuer() {
        let config = ConfigBuilder::new()
            .issuer_url("https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_abc123")
            .unwrap()
            .client_id("client-1")
            .build()
            .unwrap();
        assert_eq!(
            config.jwks_url.as_str(),
            "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_abc123/.well-known/jwks.json"
        );
    }

    #[test]
    fn jwks_url_override_wins() {
        let config = ConfigBuilder::new()
            .issuer_url("https://issuer.example/pool")
            .unwrap()
            .client_id("client-1")
            .jwks_url("https://keys.example/jwks.json")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.jwks_url.as_str(), "https://keys.example/jwks.json");
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = ConfigBuilder::new().client_id("c").build().unwrap_err();
        assert!(matches!(err, AuthError::MissingConfiguration("issuer_url")));

        let err = ConfigBuilder::new()
            .issuer_url("https://issuer.example/pool")
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingConfiguration("client_id")));
    }

    #[test]
    fn preloaded_jwks_must_be_valid_json() {
        let err = ConfigBuilder::new().preloaded_jwks("{not json").unwrap_err();
        assert!(matches!(err, AuthError::InvalidKeyFormat(_)));

        let builder = ConfigBuilder::new()
            .preloaded_jwks(r#"{"keys":[{"kty":"RSA","kid":"k1","n":"abc","e":"AQAB"}]}"#)
            .unwrap();
        assert_eq!(builder.preloaded_jwks.unwrap().keys.len(), 1);
    }
}
