use crate::comment::{self, CommentView};
use crate::config::Settings;
use crate::db::schema::{groups, posts};
use crate::db::Db;
use crate::feed::{self, PostScope, PostView};
use crate::media;
use crate::permissions::{ensure_author, Authored};
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::models::User;
use crate::users::CurrentUser;
use crate::utils::truncate_chars;
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete as diesel_delete, insert_into, select, update as diesel_update};
use log::info;
use rocket::data::Data;
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, State};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters of the text a post displays as.
pub const DISPLAY_LENGTH: usize = 15;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
    pub created: NaiveDateTime,
}

impl Post {
    pub fn load(post_id: i32, connection: &mut SqliteConnection) -> Result<Post, ApiError> {
        posts::table
            .find(post_id)
            .first::<Post>(connection)
            .optional()?
            .ok_or(ApiError::NotFound("post"))
    }
}

impl Authored for Post {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(truncate_chars(&self.text, DISPLAY_LENGTH))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    text: String,
    author_id: i32,
    group_id: Option<i32>,
    image: Option<String>,
    created: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct PostDetails {
    text: String,
    /// Id of the group to file the post under.
    #[serde(default)]
    group: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    post: PostDetails,
}

impl Validate for PostForm {
    type Error = ApiError;
    fn validate(mut self, connection: &mut SqliteConnection) -> Result<Self, ApiError> {
        let mut error = ValidationError::default();
        self.post.text = self.post.text.trim().to_owned();
        if self.post.text.is_empty() {
            error.add_error("text", "empty text");
        }

        if let Some(group_id) = self.post.group {
            let group_exists =
                select(exists(groups::table.find(group_id))).get_result::<bool>(connection)?;
            if !group_exists {
                error.add_error(
                    "group",
                    format!("Select a valid choice: group {} does not exist", group_id),
                );
            }
        }

        Ok(error.into_result(self)?)
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    post: PostView,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    post: PostView,
    /// Number of posts written by the post's author.
    total_posts: i64,
    comments: Vec<CommentView>,
}

#[post("/posts", format = "json", data = "<form>")]
pub async fn create(user: CurrentUser, db: Db, form: Json<PostForm>) -> ApiResult<PostResponse> {
    let user = user?;
    let form = form.into_inner();
    let author_id = user.id;
    let post = db
        .run(move |connection| {
            let form = form.validate(connection)?;
            let new_post = NewPost {
                text: form.post.text,
                author_id,
                group_id: form.post.group,
                image: None,
                created: Utc::now().naive_utc(),
            };
            let post = insert_into(posts::table)
                .values(&new_post)
                .get_result::<Post>(connection)?;
            feed::load_post_view(post.id, connection)
        })
        .await?;
    info!("{} published post {}", user.username, post.id);
    Ok(Json(PostResponse { post }))
}

#[get("/posts/<id>")]
pub async fn detail(db: Db, id: i32) -> ApiResult<PostDetailResponse> {
    let response = db
        .run(move |connection| {
            let post = Post::load(id, connection)?;
            let total_posts = feed::count_posts(PostScope::Author(post.author_id), connection)?;
            let comments = comment::load_for_post(&post, connection)?;
            let post = feed::load_post_view(post.id, connection)?;
            Ok(PostDetailResponse {
                post,
                total_posts,
                comments,
            })
        })
        .await?;
    Ok(Json(response))
}

#[put("/posts/<id>", format = "json", data = "<form>")]
pub async fn edit(
    user: CurrentUser,
    db: Db,
    id: i32,
    form: Json<PostForm>,
) -> ApiResult<PostResponse> {
    let user = user?;
    let form = form.into_inner();
    let post = db
        .run(move |connection| {
            let post = Post::load(id, connection)?;
            ensure_author(&user, &post)?;

            let form = form.validate(connection)?;
            diesel_update(&post)
                .set((
                    posts::text.eq(&form.post.text),
                    posts::group_id.eq(form.post.group),
                ))
                .execute(connection)?;
            info!("{} edited post {}", user.username, post.id);
            feed::load_post_view(post.id, connection)
        })
        .await?;
    Ok(Json(PostResponse { post }))
}

#[delete("/posts/<id>")]
pub async fn delete(
    user: CurrentUser,
    db: Db,
    settings: &State<Settings>,
    id: i32,
) -> ApiResult<()> {
    let user = user?;
    let media_root = settings.media_root.clone();
    db.run(move |connection| {
        let post = Post::load(id, connection)?;
        ensure_author(&user, &post)?;

        diesel_delete(&post).execute(connection)?;
        if let Some(image) = &post.image {
            media::remove_image(&media_root, image);
        }
        info!("{} deleted post {}", user.username, post.id);
        Ok(())
    })
    .await?;
    Ok(Json(()))
}

/// Swaps in a stored image and returns the one it replaced, read and written
/// in one transaction.
fn attach_image(
    user: &User,
    post_id: i32,
    image: &str,
    connection: &mut SqliteConnection,
) -> Result<(Option<String>, PostView), ApiError> {
    connection.immediate_transaction(|connection| {
        let post = Post::load(post_id, connection)?;
        ensure_author(user, &post)?;
        diesel_update(&post)
            .set(posts::image.eq(image))
            .execute(connection)?;
        Ok((post.image, feed::load_post_view(post_id, connection)?))
    })
}

#[put("/posts/<id>/image", data = "<data>")]
pub async fn upload_image(
    user: CurrentUser,
    db: Db,
    settings: &State<Settings>,
    content_type: Option<&ContentType>,
    id: i32,
    data: Data<'_>,
) -> ApiResult<PostResponse> {
    let user = user?;
    let author = user.clone();
    db.run(move |connection| ensure_author(&author, &Post::load(id, connection)?))
        .await?;

    // No connection is held while the body streams in.
    let stored = media::store_image(
        &settings.media_root,
        content_type,
        data,
        settings.max_image_bytes,
    )
    .await?;

    let image = stored.clone();
    let attached = db
        .run(move |connection| attach_image(&user, id, &image, connection))
        .await;
    let (previous, post) = match attached {
        Ok(attached) => attached,
        Err(e) => {
            media::remove_image(&settings.media_root, &stored);
            return Err(e);
        }
    };
    if let Some(previous) = previous {
        media::remove_image(&settings.media_root, &previous);
    }
    info!("attached {} to post {}", stored, post.id);
    Ok(Json(PostResponse { post }))
}
