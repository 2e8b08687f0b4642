use crate::db::schema::{comments, users};
use crate::db::Db;
use crate::permissions::{ensure_author, Authored};
use crate::post::Post;
use crate::types::{ApiError, ApiResult, ValidationError};
use crate::users::CurrentUser;
use crate::utils::serialize_date;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete as diesel_delete, insert_into};
use log::info;
use rocket::serde::json::Json;
use rocket::{delete, get, post};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub author_id: i32,
    pub post_id: i32,
    pub created: NaiveDateTime,
}

impl Authored for Comment {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Serialize, Debug)]
pub struct CommentView {
    id: i32,
    text: String,
    author: String,
    #[serde(serialize_with = "serialize_date")]
    created: NaiveDateTime,
}

impl From<(Comment, String)> for CommentView {
    fn from((comment, author): (Comment, String)) -> Self {
        CommentView {
            id: comment.id,
            text: comment.text,
            author,
            created: comment.created,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    text: String,
    author_id: i32,
    post_id: i32,
    created: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    text: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentContainer<T> {
    comment: T,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentsContainer<T> {
    comments: T,
}

/// Comments on a post, newest first.
pub fn load_for_post(
    post: &Post,
    connection: &mut SqliteConnection,
) -> Result<Vec<CommentView>, ApiError> {
    let rows = comments::table
        .inner_join(users::table)
        .filter(comments::post_id.eq(post.id))
        .select((comments::all_columns, users::username))
        .order((comments::created.desc(), comments::id.desc()))
        .load::<(Comment, String)>(connection)?;
    Ok(rows.into_iter().map(CommentView::from).collect())
}

#[post("/posts/<post_id>/comments", format = "json", data = "<details>")]
pub async fn add(
    user: CurrentUser,
    db: Db,
    post_id: i32,
    details: Json<CommentContainer<CommentBody>>,
) -> ApiResult<CommentContainer<CommentView>> {
    let user = user?;
    let text = details.into_inner().comment.text.trim().to_owned();
    let author_id = user.id;
    let comment = db
        .run(move |connection| {
            let post = Post::load(post_id, connection)?;
            if text.is_empty() {
                return Err(ValidationError::field("text", "empty comment").into());
            }

            let new_comment = NewComment {
                text,
                author_id,
                post_id: post.id,
                created: Utc::now().naive_utc(),
            };
            Ok(insert_into(comments::table)
                .values(&new_comment)
                .get_result::<Comment>(connection)?)
        })
        .await?;
    info!("{} commented on post {}", user.username, comment.post_id);

    Ok(Json(CommentContainer {
        comment: (comment, user.username).into(),
    }))
}

#[get("/posts/<post_id>/comments")]
pub async fn list(db: Db, post_id: i32) -> ApiResult<CommentsContainer<Vec<CommentView>>> {
    let comments = db
        .run(move |connection| {
            let post = Post::load(post_id, connection)?;
            load_for_post(&post, connection)
        })
        .await?;
    Ok(Json(CommentsContainer { comments }))
}

#[delete("/posts/<post_id>/comments/<id>")]
pub async fn delete(user: CurrentUser, db: Db, post_id: i32, id: i32) -> ApiResult<()> {
    let user = user?;
    db.run(move |connection| {
        let comment = comments::table
            .find(id)
            .filter(comments::post_id.eq(post_id))
            .first::<Comment>(connection)
            .optional()?
            .ok_or(ApiError::NotFound("comment"))?;
        ensure_author(&user, &comment)?;

        diesel_delete(&comment).execute(connection)?;
        info!("{} deleted comment {}", user.username, comment.id);
        Ok(())
    })
    .await?;
    Ok(Json(()))
}
