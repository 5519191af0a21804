use std::sync::Arc;

use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::FoodgramError;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

/// Signing secret and lifetime of issued session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Arc<Vec<u8>>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret.to_vec()),
            ttl,
        }
    }

    fn key(&self) -> Result<Hmac<Sha256>, potion::Error> {
        Hmac::new_from_slice(&self.secret)
            .map_err(|_| HtmlError::InternalServerError.new("Invalid session secret"))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole, ttl: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(FoodgramError::Forbidden.into());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, potion::Error> {
    let key = keys.key()?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned(), keys.ttl);

    claims
        .sign_with_key(&key)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to sign session"))
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, potion::Error> {
    let key = keys.key()?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    if session.is_expired() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 4,
            email: "anna@example.com".to_owned(),
            username: "anna".to_owned(),
            first_name: "Anna".to_owned(),
            last_name: "Petrova".to_owned(),
            password: String::new(),
            role: UserRole::User,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let token = generate_jwt_session(&user(), &keys).unwrap_or_else(|_| panic!("signing failed"));
        let session: SessionData = verify_jwt_session(&token, &keys)
            .unwrap_or_else(|_| panic!("verification failed"))
            .into();

        assert_eq!(session.user_id, 4);
        assert_eq!(session.username, "anna");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let other = SessionKeys::new(b"other-secret", Duration::hours(1));
        let token = generate_jwt_session(&user(), &other).unwrap_or_else(|_| panic!("signing failed"));

        assert!(verify_jwt_session(&token, &keys).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(-1));
        let token = generate_jwt_session(&user(), &keys).unwrap_or_else(|_| panic!("signing failed"));

        assert!(verify_jwt_session(&token, &keys).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        assert!(verify_jwt_session("not.a.token", &keys).is_err());
    }
}
