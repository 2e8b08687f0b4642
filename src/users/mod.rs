use crate::config::Settings;
use crate::db::schema::users;
use crate::db::Db;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use chrono::Utc;
use diesel::insert_into;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::info;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};

pub mod models;
mod utils;

use self::models::{NewUser, User, UserView};
use self::utils::*;

/// The acting user, or why there is none. Routes that require a login
/// bail out with `?`.
pub type CurrentUser = Result<User, ApiError>;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    user: UserView,
}

#[derive(Debug, Deserialize)]
struct RegistrationDetails {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    user: RegistrationDetails,
}

impl Validate for Registration {
    type Error = ApiError;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();

        for check in [
            validate_email(&self.user.email, connection),
            validate_username(&self.user.username, connection),
        ] {
            match check {
                Ok(_) => {}
                Err(ApiError::Validation(e)) => errors.merge(e),
                Err(other) => return Err(other),
            }
        }

        if let Err(e) = validate_password(&self.user.password) {
            errors.merge(e);
        }

        Ok(errors.into_result(self)?)
    }
}

#[post("/users", format = "json", data = "<registration>")]
pub async fn register(
    db: Db,
    settings: &State<Settings>,
    registration: Json<Registration>,
) -> ApiResult<UserResponse> {
    let registration = registration.into_inner();
    let rounds = settings.password_rounds;

    let user = db
        .run(move |connection| {
            let registration = registration.validate(connection)?;
            let new_user = NewUser {
                username: registration.user.username,
                email: registration.user.email,
                password_hash: User::make_password(&registration.user.password, rounds)?,
                joined: Utc::now().naive_utc(),
            };
            Ok(insert_into(users::table)
                .values(&new_user)
                .get_result::<User>(connection)?)
        })
        .await?;
    info!("registered user {}", user.username);
    Ok(Json(UserResponse { user: user.view()? }))
}

#[derive(Debug, Deserialize)]
struct LoginDetails {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    user: LoginDetails,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization") {
            Some(header) => header.trim_start_matches("Token ").trim().to_owned(),
            None => return Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        };

        let db = match request.guard::<Db>().await {
            Outcome::Success(db) => db,
            _ => {
                let e = ApiError::Internal("no database pool for authentication".into());
                return Outcome::Error((Status::InternalServerError, e));
            }
        };

        match db.run(move |connection| User::load_from_token(&token, connection)).await {
            Ok(user) => Outcome::Success(user),
            Err(e @ ApiError::Validation(_)) => Outcome::Error((Status::UnprocessableEntity, e)),
            Err(e @ ApiError::Unavailable) => Outcome::Error((Status::ServiceUnavailable, e)),
            Err(e) => Outcome::Error((Status::InternalServerError, e)),
        }
    }
}

#[post("/users/login", format = "json", data = "<login>")]
pub async fn login(db: Db, login: Json<Login>) -> ApiResult<UserResponse> {
    let login = login.into_inner();
    let user = db
        .run(move |connection| {
            let user = users::table
                .filter(users::email.eq(&login.user.email))
                .first::<User>(connection)
                .optional()?;
            match user {
                Some(user) if user.verify_password(&login.user.password)? => Ok(user),
                _ => Err(ValidationError::field("password", "Invalid email or password").into()),
            }
        })
        .await?;
    Ok(Json(UserResponse { user: user.view()? }))
}

#[get("/user")]
pub fn current(user: CurrentUser) -> ApiResult<UserResponse> {
    let user = user?;
    Ok(Json(UserResponse { user: user.view()? }))
}
