//! Best-effort JWT payload inspection
//!
//! Decodes the payload segment of a bearer token for display only. The token
//! is never validated here; any token that does not decode simply yields no
//! information. Nothing in this module can fail into the connection layer.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Identity summary pulled from a token payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Decode the payload segment of a JWT
///
/// Returns `None` unless the token has exactly three segments and the middle
/// one is base64url-encoded JSON.
pub fn decode_payload(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    // Tokens in the wild sometimes carry padding; strip it before decoding
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Extract the identity claims used by the console banner
///
/// User id comes from `user_id`, `sub`, or `id`; username from `username`
/// or `name`.
pub fn inspect(token: &str) -> Option<TokenIdentity> {
    let payload = decode_payload(token)?;

    let user_id = claim(&payload, &["user_id", "sub", "id"]);
    let username = claim(&payload, &["username", "name"]);

    Some(TokenIdentity { user_id, username })
}

fn claim(payload: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match payload.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_payload() {
        let token = make_token(&json!({ "user_id": "u1", "username": "alice" }));
        let payload = decode_payload(&token).unwrap();
        assert_eq!(payload["user_id"], "u1");
        assert_eq!(payload["username"], "alice");
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(decode_payload("only-one-segment").is_none());
        assert!(decode_payload("two.segments").is_none());
        assert!(decode_payload("a.b.c.d").is_none());
    }

    #[test]
    fn test_decode_rejects_garbage_payload() {
        assert!(decode_payload("aaa.!!!.ccc").is_none());
        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert!(decode_payload(&format!("h.{}.s", not_json)).is_none());
    }

    #[test]
    fn test_inspect_claim_aliases() {
        for key in ["user_id", "sub", "id"] {
            let token = make_token(&json!({ key: "u42" }));
            let identity = inspect(&token).unwrap();
            assert_eq!(identity.user_id.as_deref(), Some("u42"), "key: {}", key);
        }
        for key in ["username", "name"] {
            let token = make_token(&json!({ key: "alice" }));
            let identity = inspect(&token).unwrap();
            assert_eq!(identity.username.as_deref(), Some("alice"), "key: {}", key);
        }
    }

    #[test]
    fn test_inspect_prefers_user_id_over_sub() {
        let token = make_token(&json!({ "user_id": "primary", "sub": "secondary" }));
        let identity = inspect(&token).unwrap();
        assert_eq!(identity.user_id.as_deref(), Some("primary"));
    }

    #[test]
    fn test_inspect_numeric_id() {
        let token = make_token(&json!({ "id": 7 }));
        let identity = inspect(&token).unwrap();
        assert_eq!(identity.user_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_inspect_missing_claims() {
        let token = make_token(&json!({ "exp": 1700000000 }));
        let identity = inspect(&token).unwrap();
        assert!(identity.user_id.is_none());
        assert!(identity.username.is_none());
    }

    #[test]
    fn test_inspect_malformed_token() {
        assert!(inspect("not a jwt").is_none());
    }
}
