// src/model.rs

use crate::error::AuthError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKey {
    pub kid: String,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_purpose: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKey {
    /// Reconstructs the RSA public key described by this entry.
    ///
    /// Returns `Ok(None)` for key types other than RSA, which callers skip: a
    /// key set may contain unrelated key types. An RSA entry with a missing or
    /// malformed modulus/exponent is an error.
    ///
    /// Purely functional; safe to call concurrently without synchronization.
    pub fn to_decoding_key(&self) -> Result<Option<DecodingKey>, AuthError> {
        if self.kty != "RSA" {
            return Ok(None);
        }

        let n = self
            .n
            .as_deref()
            .ok_or_else(|| AuthError::InvalidKeyFormat("missing 'n'".into()))?;
        let e = self
            .e
            .as_deref()
            .ok_or_else(|| AuthError::InvalidKeyFormat("missing 'e'".into()))?;

        DecodingKey::from_rsa_components(n, e)
            .map(Some)
            .map_err(|err| AuthError::InvalidKeyFormat(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(n: Option<&str>, e: Option<&str>) -> JsonWebKey {
        JsonWebKey {
            kid: "key-1".into(),
            kty: "RSA".into(),
            use_purpose: Some("sig".into()),
            alg: Some("RS256".into()),
            n: n.map(String::from),
            e: e.map(String::from),
        }
    }

    #[test]
    fn non_rsa_key_is_skipped_not_fatal() {
        let jwk = JsonWebKey {
            kid: "ec-key".into(),
            kty: "EC".into(),
            use_purpose: Some("sig".into()),
            alg: Some("ES256".into()),
            n: None,
            e: None,
        };
        assert!(matches!(jwk.to_decoding_key(), Ok(None)));
    }

    #[test]
    fn rsa_key_without_modulus_is_an_error() {
        let jwk = rsa_jwk(None, Some("AQAB"));
        assert!(matches!(
            jwk.to_decoding_key(),
            Err(AuthError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn rsa_key_with_garbage_modulus_is_an_error() {
        let jwk = rsa_jwk(Some("!!not base64url!!"), Some("AQAB"));
        assert!(matches!(
            jwk.to_decoding_key(),
            Err(AuthError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn jwks_deserializes_mixed_key_types() {
        let body = serde_json::json!({
            "keys": [
                {"kty": "RSA", "kid": "a", "use": "sig", "alg": "RS256", "n": "abc", "e": "AQAB"},
                {"kty": "EC", "kid": "b", "crv": "P-256"}
            ]
        });
        let set: JsonWebKeySet = serde_json::from_value(body).unwrap();
        assert_eq!(set.keys.len(), 2);
        assert_eq!(set.keys[0].kid, "a");
        assert_eq!(set.keys[1].kty, "EC");
    }
}
