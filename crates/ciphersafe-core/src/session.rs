//! Session tokens.
//!
//! Sessions are compact HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`
//! with header `{"alg":"HS256","typ":"JWT"}` and claims `sub` (user id),
//! `iat` and `exp` (unix seconds). Tokens live for 24 hours and cannot be
//! refreshed or revoked.
//!
//! # Validation
//!
//! A token is rejected when it is malformed, when its header names any
//! algorithm other than `HS256` (including `none`), when its MAC does not
//! verify, when `now >= exp`, or when `sub` is missing or not an integer.
//! The algorithm is pinned by the issuer; the header is only checked
//! against it, never trusted to choose one.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm issued or accepted.
pub const ALGORITHM: &str = "HS256";

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// HMAC signing key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Length of the key in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Serialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Claims as received. `sub` stays loosely typed so a missing or mistyped
/// subject is reported as such rather than as a parse failure.
#[derive(Debug, Deserialize)]
struct IncomingClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
    exp: i64,
}

/// A freshly issued session token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens under one signing key.
///
/// Constructed once at startup from configuration and shared read-only.
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    key: SigningKey,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Issue a token for `user_id`, valid for 24 hours from now.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if the MAC cannot be computed.
    pub fn issue(&self, user_id: i64) -> Result<IssuedSession, SessionError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if the MAC cannot be computed.
    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<IssuedSession, SessionError> {
        let iat = now.timestamp();
        let exp = iat.saturating_add(SESSION_TTL_SECS);

        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: Some("JWT".to_owned()),
        };
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp,
        };

        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));

        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| SessionError::Signing {
                reason: format!("expiry {exp} is out of range"),
            })?;

        Ok(IssuedSession { token, expires_at })
    }

    /// Validate a token and return the user id it was issued for.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] describing why the token was rejected.
    pub fn validate(&self, token: &str) -> Result<i64, SessionError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] describing why the token was rejected.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, SessionError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed("expected three dot-separated segments"));
        };

        let header: Header = decode_json(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(SessionError::AlgorithmMismatch { found: header.alg });
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| malformed("signature is not base64url"))?;
        let signing_input_len = header_b64.len().saturating_add(1).saturating_add(claims_b64.len());
        let signing_input = &token.as_bytes()[..signing_input_len];
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let claims: IncomingClaims = decode_json(claims_b64, "claims")?;
        if now.timestamp() >= claims.exp {
            return Err(SessionError::Expired {
                expired_at: claims.exp,
            });
        }

        parse_subject(claims.sub.as_ref())
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(&self.key.0).map_err(|e| SessionError::Signing {
            reason: e.to_string(),
        })?;
        mac.update(data);
        Ok(mac)
    }
}

/// Accept the subject as a decimal string (RFC 7519 form) or a bare JSON
/// integer.
fn parse_subject(sub: Option<&serde_json::Value>) -> Result<i64, SessionError> {
    match sub {
        Some(serde_json::Value::String(s)) => s.parse().map_err(|_| SessionError::InvalidSubject),
        Some(serde_json::Value::Number(n)) => n.as_i64().ok_or(SessionError::InvalidSubject),
        _ => Err(SessionError::InvalidSubject),
    }
}

fn malformed(reason: &str) -> SessionError {
    SessionError::Malformed {
        reason: reason.to_owned(),
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, SessionError> {
    let json = serde_json::to_vec(value).map_err(|e| SessionError::Signing {
        reason: format!("serialization failed: {e}"),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> Result<T, SessionError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| malformed(&format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes).map_err(|e| malformed(&format!("invalid {what}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issuer(key: &[u8]) -> SessionIssuer {
        SessionIssuer::new(SigningKey::from_bytes(key))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    /// Sign arbitrary header/claims JSON with HS256 under `key`.
    fn forge(key: &[u8], header: &str, claims: &str) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(input.as_bytes());
        let sig = mac.finalize().into_bytes();
        format!("{input}.{}", URL_SAFE_NO_PAD.encode(sig))
    }

    #[test]
    fn issued_token_validates_immediately() {
        let issuer = issuer(b"test-jwt-secret-key");
        let session = issuer.issue_at(42, t0()).unwrap();
        assert_eq!(issuer.validate_at(&session.token, t0()).unwrap(), 42);
        assert_eq!(session.expires_at, t0() + Duration::hours(24));
    }

    #[test]
    fn issue_and_validate_against_wall_clock() {
        let issuer = issuer(b"test-jwt-secret-key");
        let session = issuer.issue(7).unwrap();
        assert_eq!(issuer.validate(&session.token).unwrap(), 7);
    }

    #[test]
    fn token_expires_at_the_24_hour_boundary() {
        let issuer = issuer(b"test-jwt-secret-key");
        let token = issuer.issue_at(1, t0()).unwrap().token;

        let just_before = t0() + Duration::hours(24) - Duration::seconds(1);
        assert_eq!(issuer.validate_at(&token, just_before).unwrap(), 1);

        let boundary = t0() + Duration::hours(24);
        assert!(matches!(
            issuer.validate_at(&token, boundary),
            Err(SessionError::Expired { .. })
        ));
        assert!(issuer.validate_at(&token, boundary + Duration::days(3)).is_err());
    }

    #[test]
    fn different_key_is_rejected() {
        let token = issuer(b"key-one-key-one-key-one").issue_at(1, t0()).unwrap().token;
        let result = issuer(b"key-two-key-two-key-two").validate_at(&token, t0());
        assert_eq!(result, Err(SessionError::BadSignature));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        use sha2::Sha512;

        let key = b"test-jwt-secret-key";
        let exp = t0().timestamp() + 60;
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS512","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","iat":0,"exp":{exp}}}"#))
        );
        let mut mac = Hmac::<Sha512>::new_from_slice(key).unwrap();
        mac.update(input.as_bytes());
        let token = format!(
            "{input}.{}",
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        );

        assert_eq!(
            issuer(key).validate_at(&token, t0()),
            Err(SessionError::AlgorithmMismatch {
                found: "HS512".to_owned()
            })
        );
    }

    #[test]
    fn alg_none_is_rejected() {
        let exp = t0().timestamp() + 60;
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{exp}}}"#))
        );
        assert!(matches!(
            issuer(b"k").validate_at(&token, t0()),
            Err(SessionError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let issuer = issuer(b"test-jwt-secret-key");
        let token = issuer.issue_at(1, t0()).unwrap().token;
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"sub":"2","iat":0,"exp":{}}}"#,
            t0().timestamp() + 60
        ));
        let forged = format!("{}.{forged_claims}.{}", parts[0], parts[2]);
        assert_eq!(
            issuer.validate_at(&forged, t0()),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn missing_or_malformed_subject_is_rejected() {
        let key = b"test-jwt-secret-key";
        let header = r#"{"alg":"HS256","typ":"JWT"}"#;
        let exp = t0().timestamp() + 60;

        for claims in [
            format!(r#"{{"iat":0,"exp":{exp}}}"#),
            format!(r#"{{"sub":"alice","exp":{exp}}}"#),
            format!(r#"{{"sub":1.5,"exp":{exp}}}"#),
            format!(r#"{{"sub":null,"exp":{exp}}}"#),
        ] {
            let token = forge(key, header, &claims);
            assert_eq!(
                issuer(key).validate_at(&token, t0()),
                Err(SessionError::InvalidSubject),
                "claims {claims} should be rejected"
            );
        }
    }

    #[test]
    fn numeric_subject_is_accepted() {
        let key = b"test-jwt-secret-key";
        let exp = t0().timestamp() + 60;
        let token = forge(
            key,
            r#"{"alg":"HS256","typ":"JWT"}"#,
            &format!(r#"{{"sub":9,"iat":0,"exp":{exp}}}"#),
        );
        assert_eq!(issuer(key).validate_at(&token, t0()).unwrap(), 9);
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = issuer(b"k");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(matches!(
                issuer.validate_at(token, t0()),
                Err(SessionError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn signing_key_debug_redacts_bytes() {
        let key = SigningKey::from_bytes(b"super-secret-signing-key");
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
