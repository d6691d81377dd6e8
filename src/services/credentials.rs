use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::{AccessClaims, RefreshClaims};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::error;

pub struct CredentialService;

impl CredentialService {
    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        hash(password, DEFAULT_COST).map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
    }

    pub fn verify_password(password: &str, hashed: &str) -> Result<bool, ApiError> {
        verify(password, hashed).map_err(|e| {
            error!("Failed to verify password: {}", e);
            ApiError::Internal("Failed to verify password".to_string())
        })
    }

    // Guard against double-hashing when an update forwards a stored value
    // back unchanged. bcrypt output always carries one of these prefixes.
    pub fn looks_hashed(value: &str) -> bool {
        value.starts_with("$2a$") || value.starts_with("$2b$") || value.starts_with("$2y$")
    }

    // Access token: identity plus the aggregated permission-id claims.
    pub fn generate_access_token(
        subject: &str,
        permission_ids: &[i32],
        config: &AppConfig,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(config.jwt_expiry_hours)).timestamp() as usize,
            permissions: permission_ids.to_vec(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::Internal("Failed to generate token".to_string())
        })
    }

    // Refresh token: identity only, signed with the refresh secret and a
    // longer horizon than the access token.
    pub fn generate_refresh_token(subject: &str, config: &AppConfig) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: subject.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::days(config.refresh_expiry_days)).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
        )
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            ApiError::Internal("Failed to generate token".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn test_config() -> AppConfig {
        AppConfig {
            jwt_secret: "access-secret".to_string(),
            jwt_refresh_secret: "refresh-secret".to_string(),
            jwt_expiry_hours: 1,
            refresh_expiry_days: 7,
            client_default_password: "client@123".to_string(),
            qr_code_dir: "public/qr-codes".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let hashed = CredentialService::hash_password("s3cret-pass").unwrap();
        assert!(CredentialService::verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!CredentialService::verify_password("wrong-pass", &hashed).unwrap());
    }

    #[test]
    fn hashed_values_are_recognized() {
        let hashed = CredentialService::hash_password("s3cret-pass").unwrap();
        assert!(CredentialService::looks_hashed(&hashed));
        assert!(!CredentialService::looks_hashed("s3cret-pass"));
        assert!(CredentialService::looks_hashed("$2a$10$abcdefghijklmnopqrstuv"));
    }

    #[test]
    fn access_token_carries_identity_and_permissions() {
        let config = test_config();
        let token =
            CredentialService::generate_access_token("EMP001", &[1, 4, 7], &config).unwrap();

        let decoded = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "EMP001");
        assert_eq!(decoded.claims.permissions, vec![1, 4, 7]);
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let config = test_config();
        let access =
            CredentialService::generate_access_token("EMP001", &[], &config).unwrap();
        let refresh = CredentialService::generate_refresh_token("EMP001", &config).unwrap();

        let access_claims = decode::<AccessClaims>(
            &access,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;
        let refresh_claims = decode::<RefreshClaims>(
            &refresh,
            &DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert!(refresh_claims.exp > access_claims.exp);
    }

    #[test]
    fn tokens_are_signed_with_distinct_secrets() {
        let config = test_config();
        let refresh = CredentialService::generate_refresh_token("EMP001", &config).unwrap();

        // Decoding the refresh token against the access secret must fail.
        let result = decode::<RefreshClaims>(
            &refresh,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
