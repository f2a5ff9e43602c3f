use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Access-token claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    match &config.jwt_audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized
    })
}

#[cfg(test)]
pub(crate) fn mint_test_token(user_id: Uuid, email: Option<&str>, config: &Config) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + 900,
        iat: Some(now),
        email: email.map(String::from),
        role: Some("authenticated".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_valid_token_yields_subject() {
        let config = Config::for_tests();
        let user_id = Uuid::new_v4();
        let token = mint_test_token(user_id, Some("a@b.com"), &config);

        let data = verify_token(&token, &config).unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let config = Config::for_tests();
        let token = mint_test_token(Uuid::new_v4(), None, &config);

        let mut other = Config::for_tests();
        other.jwt_secret = "some-other-secret".into();
        assert!(matches!(verify_token(&token, &other), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let config = Config::for_tests();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: now - 3600,
            iat: Some(now - 7200),
            email: None,
            role: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_token(&token, &config), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_token_without_subject_is_unauthorized() {
        let config = Config::for_tests();
        let exp = chrono::Utc::now().timestamp() + 900;
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "role": "anon", "exp": exp }),
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_token(&token, &config), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_audience_enforced_when_configured() {
        let mut config = Config::for_tests();
        config.jwt_audience = Some("authenticated".into());
        let exp = chrono::Utc::now().timestamp() + 900;
        let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let user_id = Uuid::new_v4();

        let good = encode(
            &Header::default(),
            &serde_json::json!({ "sub": user_id, "exp": exp, "aud": "authenticated" }),
            &key,
        )
        .unwrap();
        let bad = encode(
            &Header::default(),
            &serde_json::json!({ "sub": user_id, "exp": exp, "aud": "service" }),
            &key,
        )
        .unwrap();

        assert!(verify_token(&good, &config).is_ok());
        assert!(verify_token(&bad, &config).is_err());
    }
}
