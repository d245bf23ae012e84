//! Signed token codec.
//!
//! Serializes credentials to HS256 compact JWS strings and back. Decoding
//! checks signature and algorithm only; expiry is judged by the issuer from
//! the credential's own `exp` against its injected clock.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use super::credential::Credential;

/// Secrets shorter than this are accepted but logged as weak.
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Codec error types.
///
/// Decoding failures are either [`SignatureInvalid`](Self::SignatureInvalid)
/// or [`Malformed`](Self::Malformed); no partially decoded credential is ever
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Token encoding failed: {0}")]
    Encode(String),
    #[error("Token signature invalid")]
    SignatureInvalid,
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// HS256 codec for credentials.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// Create a codec from an HMAC secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked by the issuer against its own clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create a codec from the `TOKEN_HMAC_SECRET` environment variable.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let secret = lookup("TOKEN_HMAC_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| crate::Error::config("TOKEN_HMAC_SECRET is not set"))?;

        if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warn!(
                len = secret.len(),
                recommended = MIN_RECOMMENDED_SECRET_LEN,
                "TOKEN_HMAC_SECRET is shorter than recommended"
            );
        }

        info!("Token codec initialized (algorithm: HS256)");
        Ok(Self::new(secret.as_bytes()))
    }

    /// Serialize and sign a credential.
    pub fn encode(&self, credential: &Credential) -> Result<String, CodecError> {
        encode(
            &Header::new(Algorithm::HS256),
            credential,
            &self.encoding_key,
        )
        .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Verify and decode a token string.
    pub fn decode(&self, token: &str) -> Result<Credential, CodecError> {
        decode::<Credential>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => CodecError::SignatureInvalid,
                _ => CodecError::Malformed(e.to_string()),
            })
    }
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &"HS256")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential::{AccessCredential, RefreshCredential};

    fn create_test_codec() -> JwtCodec {
        JwtCodec::new(b"test-secret-key-32-chars-long!!!")
    }

    fn refresh(identity: &str, generation: i64) -> Credential {
        Credential::from(RefreshCredential {
            identity: identity.to_string(),
            generation,
            expires_at: 4_102_444_800,
        })
    }

    #[test]
    fn test_encode_and_decode_refresh() {
        let codec = create_test_codec();
        let credential = refresh("user123", 4);

        let token = codec.encode(&credential).expect("encoding should succeed");
        assert_eq!(token.split('.').count(), 3);

        let decoded = codec.decode(&token).expect("decoding should succeed");
        assert_eq!(decoded, credential);
    }

    #[test]
    fn test_expired_credential_still_decodes() {
        // Expiry belongs to the issuer, not the codec.
        let codec = create_test_codec();
        let credential = Credential::from(AccessCredential {
            identity: "user123".to_string(),
            expires_at: 1,
        });

        let token = codec.encode(&credential).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), credential);
    }

    #[test]
    fn test_no_codec_timestamp_added() {
        use base64::Engine as _;

        let codec = create_test_codec();
        let token = codec.encode(&refresh("user123", 0)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let claims: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(claims["type"], "refresh");
        assert!(claims.get("iat").is_none());
        assert!(claims.get("nbf").is_none());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = create_test_codec();
        assert!(matches!(
            codec.decode("invalid.token.here"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(codec.decode(""), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let codec1 = JwtCodec::new(b"secret1-32-chars-long-key!!!!!!!");
        let codec2 = JwtCodec::new(b"secret2-32-chars-long-key!!!!!!!");

        let token = codec1.encode(&refresh("user", 0)).unwrap();
        assert!(matches!(
            codec2.decode(&token),
            Err(CodecError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_every_flipped_character_is_rejected() {
        let codec = create_test_codec();
        let token = codec.encode(&refresh("u1", 2)).unwrap();

        for (i, c) in token.char_indices() {
            if c == '.' {
                continue;
            }
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &replacement.to_string());

            assert!(
                codec.decode(&tampered).is_err(),
                "tampered token at position {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_from_lookup_requires_secret() {
        assert!(matches!(
            JwtCodec::from_lookup(|_| None),
            Err(crate::Error::Configuration(_))
        ));
        assert!(JwtCodec::from_lookup(|_| Some(String::new())).is_err());
        assert!(JwtCodec::from_lookup(|_| Some("short".to_string())).is_ok());
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", create_test_codec());
        assert!(!rendered.contains("test-secret"));
    }
}
