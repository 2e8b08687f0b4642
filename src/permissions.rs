//! Who may do what. Being logged in is checked by the `CurrentUser` guard;
//! this module covers the checks that depend on the target row.

use crate::types::ApiError;
use crate::users::models::User;
use log::warn;

/// Rows that belong to the user who wrote them.
pub trait Authored {
    fn author_id(&self) -> i32;
}

pub fn is_author<T: Authored>(actor: &User, item: &T) -> bool {
    actor.id == item.author_id()
}

/// Edits and deletes are reserved for the author.
pub fn ensure_author<T: Authored>(actor: &User, item: &T) -> Result<(), ApiError> {
    if is_author(actor, item) {
        Ok(())
    } else {
        warn!(
            "user {} tried to change a row owned by user id {}",
            actor.username,
            item.author_id()
        );
        Err(ApiError::Forbidden)
    }
}

/// Following oneself is never recorded.
pub fn can_follow(actor: &User, author: &User) -> bool {
    actor.id != author.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct Note {
        author_id: i32,
    }

    impl Authored for Note {
        fn author_id(&self) -> i32 {
            self.author_id
        }
    }

    fn user(id: i32) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            joined: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn author_may_change_own_rows() {
        assert!(ensure_author(&user(1), &Note { author_id: 1 }).is_ok());
    }

    #[test]
    fn others_are_forbidden() {
        match ensure_author(&user(2), &Note { author_id: 1 }) {
            Err(ApiError::Forbidden) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn nobody_follows_themself() {
        assert!(!can_follow(&user(1), &user(1)));
        assert!(can_follow(&user(1), &user(2)));
    }
}
