use crate::config::Settings;
use crate::db::schema::follows;
use crate::db::Db;
use crate::feed::{self, PostScope, PostView};
use crate::pagination::Page;
use crate::permissions::can_follow;
use crate::types::{ApiError, ApiResult};
use crate::users::models::User;
use crate::users::CurrentUser;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete as diesel_delete, insert_or_ignore_into, select};
use log::info;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Profile {
    pub username: String,
    /// Whether the acting user follows this author.
    pub following: bool,
    pub total_posts: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    profile: Profile,
    posts: Page<PostView>,
}

pub fn is_following(
    follower: &User,
    author: &User,
    connection: &mut SqliteConnection,
) -> Result<bool, ApiError> {
    let query = follows::table
        .filter(follows::user_id.eq(follower.id))
        .filter(follows::author_id.eq(author.id));
    Ok(select(exists(query)).get_result::<bool>(connection)?)
}

fn profile_of(
    author: User,
    following: bool,
    connection: &mut SqliteConnection,
) -> Result<Profile, ApiError> {
    let total_posts = feed::count_posts(PostScope::Author(author.id), connection)?;
    Ok(Profile {
        username: author.username,
        following,
        total_posts,
    })
}

#[get("/profiles/<name>?<page>")]
pub async fn profile(
    current_user: Option<User>,
    db: Db,
    settings: &State<Settings>,
    name: &str,
    page: Option<&str>,
) -> ApiResult<ProfilePage> {
    let name = name.to_owned();
    let requested = page.map(str::to_owned);
    let per_page = settings.page_size;
    let page = db
        .run(move |connection| {
            let author = User::load_by_name(&name, connection)?;
            let following = match current_user {
                Some(current) => is_following(&current, &author, connection)?,
                None => false,
            };

            let posts = feed::load_page(
                PostScope::Author(author.id),
                requested.as_deref(),
                per_page,
                connection,
            )?;
            let profile = profile_of(author, following, connection)?;
            Ok(ProfilePage { profile, posts })
        })
        .await?;
    Ok(Json(page))
}

#[post("/profiles/<name>/follow")]
pub async fn follow(current_user: CurrentUser, db: Db, name: &str) -> ApiResult<ProfileResponse> {
    let current = current_user?;
    let name = name.to_owned();
    let profile = db
        .run(move |connection| {
            let author = User::load_by_name(&name, connection)?;
            if can_follow(&current, &author) {
                insert_or_ignore_into(follows::table)
                    .values((
                        follows::user_id.eq(current.id),
                        follows::author_id.eq(author.id),
                    ))
                    .execute(connection)?;
                info!("{} follows {}", current.username, author.username);
            }

            let following = is_following(&current, &author, connection)?;
            profile_of(author, following, connection)
        })
        .await?;
    Ok(Json(ProfileResponse { profile }))
}

#[delete("/profiles/<name>/follow")]
pub async fn unfollow(
    current_user: CurrentUser,
    db: Db,
    name: &str,
) -> ApiResult<ProfileResponse> {
    let current = current_user?;
    let name = name.to_owned();
    let profile = db
        .run(move |connection| {
            let author = User::load_by_name(&name, connection)?;
            let removed = diesel_delete(
                follows::table
                    .filter(follows::user_id.eq(current.id))
                    .filter(follows::author_id.eq(author.id)),
            )
            .execute(connection)?;
            if removed > 0 {
                info!("{} unfollowed {}", current.username, author.username);
            }
            profile_of(author, false, connection)
        })
        .await?;
    Ok(Json(ProfileResponse { profile }))
}
