//! Service-account JWT signing for Google OAuth2.
//!
//! Grounded on the teacher's own Google service-account JWT module
//! (`source/google_drive/jwt.rs`), but signed with the `jsonwebtoken`
//! crate's RSA support rather than a hand-rolled bignum RSA
//! implementation — `jsonwebtoken` is already in the broader example
//! pack (`agourakis82-beagle`) for exactly this concern, and the Python
//! original this pipeline was distilled from signs its service-account
//! assertions with `google-auth`/`cryptography`, not bespoke math.

use jsonwebtoken::{Algorithm, EncodingKey, Header};

/// Build a signed JWT (RS256) from `claims` and a PEM-encoded RSA private key.
pub fn build_jwt(claims: &serde_json::Value, private_key_pem: &str) -> Result<String, String> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| format!("invalid RSA private key: {e}"))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key)
        .map_err(|e| format!("JWT signing failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_pem_fails_with_context() {
        let claims = serde_json::json!({"iss": "svc@example.iam.gserviceaccount.com"});
        let err = build_jwt(&claims, "not a pem").unwrap_err();
        assert!(err.contains("invalid RSA private key"));
    }

    #[test]
    fn empty_pem_fails_with_context() {
        let claims = serde_json::json!({"iss": "svc@example.iam.gserviceaccount.com"});
        let err = build_jwt(&claims, "").unwrap_err();
        assert!(err.contains("invalid RSA private key"));
    }
}
