use crate::types::{ApiError, ValidationError};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::select;
use diesel::sqlite::SqliteConnection;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"(?i)\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).expect("email pattern compiles")
    };
    static ref USERNAME_RE: Regex = Regex::new(r"\A[\w.@+-]{1,150}\z").expect("username pattern compiles");
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_email_re(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        Err(ValidationError::field(
            "email",
            format!("Invalid email: {}", email),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_username_re(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        Err(ValidationError::field(
            "username",
            "Enter a valid username: up to 150 letters, digits and @/./+/-/_ characters",
        ))
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        Err(ValidationError::field(
            "password",
            format!(
                "Password too short: at least {} characters",
                MIN_PASSWORD_LENGTH
            ),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_email(
    email_to_validate: &str,
    connection: &mut SqliteConnection,
) -> Result<(), ApiError> {
    use crate::db::schema::users::dsl::*;
    let mut errors = ValidationError::default();
    if let Err(e) = validate_email_re(email_to_validate) {
        errors.merge(e);
    }

    let email_exists =
        select(exists(users.filter(email.eq(email_to_validate)))).get_result::<bool>(connection)?;
    if email_exists {
        errors.add_error("email", "Email already exists");
    }
    errors.into_result(()).map_err(ApiError::from)
}

pub fn validate_username(
    username_to_validate: &str,
    connection: &mut SqliteConnection,
) -> Result<(), ApiError> {
    use crate::db::schema::users::dsl::*;
    let mut errors = ValidationError::default();
    if let Err(e) = validate_username_re(username_to_validate) {
        errors.merge(e);
    }

    let username_exists = select(exists(users.filter(username.eq(username_to_validate))))
        .get_result::<bool>(connection)?;
    if username_exists {
        errors.add_error("username", "Username already exists");
    }
    errors.into_result(()).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email_re("leo@example.com").is_ok());
        assert!(validate_email_re("leo.tolstoy+blog@mail.example.org").is_ok());
        assert!(validate_email_re("Leo@Example.com").is_ok());
        assert!(validate_email_re("leo@").is_err());
        assert!(validate_email_re("not an email").is_err());
    }

    #[test]
    fn usernames() {
        assert!(validate_username_re("StasBasov").is_ok());
        assert!(validate_username_re("user_1.test@+-").is_ok());
        assert!(validate_username_re("").is_err());
        assert!(validate_username_re("has space").is_err());
        assert!(validate_username_re(&"a".repeat(151)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }
}
