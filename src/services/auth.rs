// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Claims, CurrentUser},
};

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Valida o Bearer token e devolve o usuário da requisição.
    pub fn validate_token(&self, token: &str) -> Result<CurrentUser, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(CurrentUser { id: token_data.claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token_for(user_id: Uuid, secret: &str, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl_secs) as usize,
            iat: now as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn accepts_token_signed_with_the_same_secret() {
        let user_id = Uuid::new_v4();
        let service = AuthService::new("segredo".into());
        let user = service.validate_token(&token_for(user_id, "segredo", 3600)).unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn rejects_foreign_or_expired_tokens() {
        let service = AuthService::new("segredo".into());
        let foreign = token_for(Uuid::new_v4(), "outro", 3600);
        assert!(matches!(service.validate_token(&foreign), Err(AppError::InvalidToken)));

        let expired = token_for(Uuid::new_v4(), "segredo", -3600);
        assert!(matches!(service.validate_token(&expired), Err(AppError::InvalidToken)));
    }
}
