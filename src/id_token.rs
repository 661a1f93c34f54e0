//! ID token payload decoding.
//!
//! Trust boundary: the signature is NOT verified. Claims are only trusted
//! because the token is read straight from the token endpoint response over
//! TLS in the same exchange. Never feed this a token that arrived through a
//! user-controlled channel (query string, storage written by someone else,
//! request header).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::types::UserProfile;

/// Claims decoded from an ID token payload.
#[derive(Debug, Clone)]
pub struct IdTokenClaims {
    inner: JsonValue,
}

impl IdTokenClaims {
    /// Gets a claim value by key.
    #[must_use]
    pub fn get_claim(&self, key: &str) -> Option<&JsonValue> {
        self.inner.get(key)
    }

    #[must_use]
    pub fn as_json(&self) -> &JsonValue {
        &self.inner
    }

    fn string_claim(&self, key: &str) -> Option<&str> {
        self.get_claim(key).and_then(JsonValue::as_str)
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.string_claim("email")
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.string_claim("name")
    }

    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.string_claim("picture")
    }

    /// Build the user profile. A missing `email` claim becomes an empty string.
    #[must_use]
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            email: self.email().unwrap_or_default().to_owned(),
            name: self.name().map(str::to_owned),
            picture: self.picture().map(str::to_owned),
        }
    }
}

/// Decode the payload (middle) segment of a JWT without verifying its signature.
///
/// Accepts base64url with or without `=` padding.
///
/// # Errors
///
/// Returns [`Error::TokenParse`] if the token has no payload segment, the
/// segment is not base64url, or it does not decode to a JSON object.
pub fn decode_unverified_claims(id_token: &str) -> Result<IdTokenClaims, Error> {
    let payload_b64 = id_token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| Error::TokenParse("missing payload segment".into()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64.trim_end_matches('='))
        .map_err(|e| Error::TokenParse(format!("invalid base64url: {e}")))?;

    let inner: JsonValue = serde_json::from_slice(&payload)
        .map_err(|e| Error::TokenParse(format!("invalid JSON: {e}")))?;
    if !inner.is_object() {
        return Err(Error::TokenParse("payload is not a JSON object".into()));
    }

    Ok(IdTokenClaims { inner })
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &JsonValue) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decodes_profile_claims() {
        let token = encode_test_token(&json!({"email": "a@b.com", "name": "A", "sub": "123"}));
        let claims = decode_unverified_claims(&token).unwrap();

        assert_eq!(claims.email(), Some("a@b.com"));
        assert_eq!(claims.get_claim("sub"), Some(&json!("123")));
        assert_eq!(
            claims.to_profile(),
            UserProfile {
                email: "a@b.com".into(),
                name: Some("A".into()),
                picture: None,
            }
        );
    }

    #[test]
    fn test_missing_email_defaults_to_empty() {
        let token = encode_test_token(&json!({"name": "No Mail"}));
        let profile = decode_unverified_claims(&token).unwrap().to_profile();

        assert_eq!(profile.email, "");
        assert_eq!(profile.name.as_deref(), Some("No Mail"));
    }

    #[test]
    fn test_accepts_padded_payload() {
        // 7 bytes of JSON encode with two padding characters
        let payload = URL_SAFE.encode(br#"{"a":1}"#);
        assert!(payload.ends_with("=="));
        let token = format!("h.{payload}.s");
        assert!(decode_unverified_claims(&token).is_ok());
    }

    #[test]
    fn test_decodes_non_ascii_claims() {
        let token = encode_test_token(&json!({"email": "t@example.jp", "name": "山田 太郎"}));
        let claims = decode_unverified_claims(&token).unwrap();
        assert_eq!(claims.name(), Some("山田 太郎"));
    }

    #[test]
    fn test_rejects_missing_segment() {
        assert!(matches!(decode_unverified_claims("onlyheader"), Err(Error::TokenParse(_))));
        assert!(matches!(decode_unverified_claims("h..s"), Err(Error::TokenParse(_))));
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = decode_unverified_claims("h.!!!not-base64!!!.s").unwrap_err();
        assert!(matches!(err, Error::TokenParse(_)));
    }

    #[test]
    fn test_rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        let err = decode_unverified_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err, Error::TokenParse(_)));
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let payload = URL_SAFE_NO_PAD.encode("[1,2,3]");
        let err = decode_unverified_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err, Error::TokenParse(_)));
    }
}
