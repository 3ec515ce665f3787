use super::models::AccessClaims;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sharebox_core::AppError;

/// Sign an HS256 access token for `user_id`.
pub fn issue_access_token(secret: &str, user_id: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = AccessClaims {
        user_id: user_id.to_string(),
        exp: (now + ttl).timestamp(),
        iat: Some(now.timestamp()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
}

/// Verify signature and expiry of an HS256 access token.
pub fn decode_access_token(secret: &str, token: &str) -> Result<AccessClaims, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token has expired, please login again".to_string())
            }
            _ => AppError::Unauthorized("Invalid token, please login again".to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issue_and_decode() {
        let token = issue_access_token(SECRET, "user-42", Duration::minutes(5)).unwrap();
        let claims = decode_access_token(SECRET, &token).unwrap();
        assert_eq!(claims.user_id, "user-42");
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_access_token(SECRET, "user-42", Duration::hours(-2)).unwrap();
        match decode_access_token(SECRET, &token) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("expired")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_access_token(SECRET, "user-42", Duration::minutes(5)).unwrap();
        let other_secret = "ffffffffffffffffffffffffffffffff";
        assert!(matches!(
            decode_access_token(other_secret, &token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
