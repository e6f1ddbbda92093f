//! Password hashing and bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::{ApiError, ApiResult};

/// bcrypt only looks at the first 72 bytes of its input.
const BCRYPT_MAX_BYTES: usize = 72;

/// Lifetime of tokens issued without an explicit ttl.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;

/// Cuts `password` to at most 72 bytes without splitting a UTF-8 character.
fn truncate_for_bcrypt(password: &str) -> &str {
    if password.len() <= BCRYPT_MAX_BYTES {
        return password;
    }
    let mut end = BCRYPT_MAX_BYTES;
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    &password[..end]
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(truncate_for_bcrypt(password), cost)
}

/// Malformed hashes never verify.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    bcrypt::verify(truncate_for_bcrypt(password), hashed).unwrap_or(false)
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_async(password: String, cost: u32) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

pub async fn verify_password_async(password: String, hashed: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(ApiError::internal)
}

/// Claims carried by every issued token. `sub` is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Signs and checks HMAC JSON Web Tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issues a token for `user_id`, valid for `ttl` (15 minutes when `None`).
    pub fn issue(
        &self,
        user_id: i32,
        username: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES));
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.map(str::to_owned),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// Looks a user up by email or username and checks the password.
pub async fn authenticate_user<C>(
    db: &C,
    login: &str,
    password: &str,
) -> ApiResult<Option<user::Model>>
where
    C: ConnectionTrait,
{
    let found = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(login))
                .add(user::Column::Username.eq(login)),
        )
        .one(db)
        .await?;

    let Some(user) = found else {
        return Ok(None);
    };

    if verify_password_async(password.to_owned(), user.password.clone()).await? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("strongpassword123", 4).unwrap();
        assert!(verify_password("strongpassword123", &hashed));
        assert!(!verify_password("wrong", &hashed));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn long_passwords_truncate_on_char_boundary() {
        // 71 ASCII bytes followed by a two-byte character straddling the limit.
        let password = format!("{}é", "a".repeat(71));
        assert_eq!(truncate_for_bcrypt(&password), "a".repeat(71));

        let hashed = hash_password(&password, 4).unwrap();
        assert!(verify_password(&"a".repeat(71), &hashed));
    }

    #[test]
    fn token_round_trip() {
        let issuer = TokenIssuer::new(b"secret", Algorithm::HS256);
        let token = issuer.issue(42, Some("kolbasa"), None).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.username.as_deref(), Some("kolbasa"));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenIssuer::new(b"secret", Algorithm::HS256);
        let other = TokenIssuer::new(b"other", Algorithm::HS256);
        let token = other.issue(1, None, None).unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(b"secret", Algorithm::HS256);
        let token = issuer.issue(1, None, Some(Duration::minutes(-5))).unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn cost_outside_bcrypt_bounds_fails() {
        assert!(hash_password("strongpassword123", 3).is_err());
        assert!(hash_password("strongpassword123", 32).is_err());
        let hashed = hash_password("strongpassword123", 4).unwrap();
        assert!(hashed.starts_with("$2b$04$"));
    }
}
