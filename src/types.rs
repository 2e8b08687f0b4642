use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use log::error;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Error as IoError;
use thiserror::Error;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error>;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Diesel(#[from] DieselError),

    #[error("validation failed: {0:?}")]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] IoError),

    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("no database connection available")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Field name to messages, serialized as the `errors` object of a 422 body.
#[derive(Debug, Serialize, Default, Error)]
#[error("invalid input")]
pub struct ValidationError(BTreeMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn field<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when nothing was recorded, the collected errors otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let (status, body) = match self {
            ApiError::Diesel(DieselError::NotFound) => {
                (Status::NotFound, json!({ "errors": ["entity not found"] }))
            }
            ApiError::Diesel(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                let body = json!({ "errors": { "database": [info.message()] } });
                (Status::UnprocessableEntity, body)
            }
            ApiError::NotFound(what) => (
                Status::NotFound,
                json!({ "errors": [format!("{} not found", what)] }),
            ),
            ApiError::Validation(error) => {
                (Status::UnprocessableEntity, json!({ "errors": error }))
            }
            ApiError::Unauthorized => (
                Status::Unauthorized,
                json!({ "errors": { "status": "401 Unauthorized" } }),
            ),
            ApiError::Forbidden => (
                Status::Forbidden,
                json!({ "errors": { "status": "403 Forbidden" } }),
            ),
            ApiError::Unavailable => (
                Status::ServiceUnavailable,
                json!({ "errors": { "status": "503 Service Unavailable" } }),
            ),
            other => {
                error!("{} {} failed: {}", req.method(), req.uri(), other);
                (
                    Status::InternalServerError,
                    json!({ "errors": ["internal server error"] }),
                )
            }
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_messages_of_both_sides() {
        let mut error = ValidationError::field("email", "Invalid email: x");
        let mut other = ValidationError::field("email", "Email already exists");
        other.add_error("password", "Password too short");
        error.merge(other);

        assert_eq!(error.len(), 2);
        assert_eq!(error.messages("email").len(), 2);
        assert_eq!(error.messages("password"), ["Password too short"]);
        assert!(error.messages("username").is_empty());
    }

    #[test]
    fn into_result_is_ok_only_without_errors() {
        assert_eq!(ValidationError::default().into_result(7).unwrap(), 7);
        assert!(ValidationError::field("text", "empty text")
            .into_result(7)
            .is_err());
    }
}
