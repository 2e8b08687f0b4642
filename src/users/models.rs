use crate::db::schema::users;
use crate::types::{ApiError, ValidationError};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use hmac::{Hmac, Mac};
use jwt::{Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use serde::Serialize;
use sha2::Sha256;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub joined: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub joined: NaiveDateTime,
}

/// The authenticated view of a user, carrying a fresh token.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub token: String,
}

fn invalid_token() -> ApiError {
    ValidationError::field("token", "Invalid jwt token").into()
}

impl User {
    pub fn make_password(password: &str, rounds: u32) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params {
            rounds,
            output_length: 32,
        };
        Pbkdf2
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, candidate: &str) -> Result<bool, ApiError> {
        let stored = PasswordHash::new(&self.password_hash)
            .map_err(|e| ApiError::Internal(format!("stored password hash unreadable: {}", e)))?;
        Ok(Pbkdf2
            .verify_password(candidate.as_bytes(), &stored)
            .is_ok())
    }

    // Tokens are signed with the password hash, so a password change
    // revokes every token issued before it.
    fn signing_key(&self) -> Result<Hmac<Sha256>, ApiError> {
        Hmac::new_from_slice(self.password_hash.as_bytes())
            .map_err(|e| ApiError::Internal(format!("bad signing key: {}", e)))
    }

    pub fn token(&self) -> Result<String, ApiError> {
        let claims = RegisteredClaims {
            issuer: Some(self.email.clone()),
            subject: Some(self.id.to_string()),
            ..Default::default()
        };
        claims
            .sign_with_key(&self.signing_key()?)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
    }

    pub fn view(&self) -> Result<UserView, ApiError> {
        Ok(UserView {
            username: self.username.clone(),
            email: self.email.clone(),
            token: self.token()?,
        })
    }

    pub fn load_from_token(
        jwt_token: &str,
        connection: &mut SqliteConnection,
    ) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;

        let unverified: Token<Header, RegisteredClaims, _> =
            Token::parse_unverified(jwt_token).map_err(|_| invalid_token())?;
        let user_id = unverified
            .claims()
            .subject
            .as_ref()
            .and_then(|sub| sub.parse::<i32>().ok())
            .ok_or_else(invalid_token)?;

        let user = users
            .find(user_id)
            .first::<User>(connection)
            .optional()?
            .ok_or_else(invalid_token)?;

        let claims: RegisteredClaims = jwt_token
            .verify_with_key(&user.signing_key()?)
            .map_err(|_| invalid_token())?;
        if claims.issuer.as_deref() != Some(user.email.as_str()) {
            return Err(invalid_token());
        }
        Ok(user)
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;
        users
            .filter(username.eq(name))
            .first::<User>(connection)
            .optional()?
            .ok_or(ApiError::NotFound("user"))
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.username)
    }
}
