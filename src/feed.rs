//! Post listings: the home page, group pages, profile pages and the feed of
//! followed authors all read through `load_page`.

use crate::cache::PageCache;
use crate::config::Settings;
use crate::db::schema::{follows, groups, posts, users};
use crate::db::Db;
use crate::group::Group;
use crate::pagination::{requested_number, Page, Paginator};
use crate::post::Post;
use crate::types::{ApiError, ApiResult};
use crate::users::CurrentUser;
use crate::utils::serialize_date;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use rocket::serde::json::Json;
use rocket::{get, State};
use serde::Serialize;
use serde_json::{json, Value};

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i32),
    Author(i32),
    /// Posts by the authors this user follows.
    FollowedBy(i32),
}

#[derive(Debug, Serialize)]
pub struct GroupRef {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created: NaiveDateTime,
}

type PostRow = (Post, String, Option<Group>);

impl From<PostRow> for PostView {
    fn from((post, author, group): PostRow) -> Self {
        PostView {
            id: post.id,
            text: post.text,
            author,
            group: group.map(|g| GroupRef {
                slug: g.slug,
                title: g.title,
            }),
            image: post.image,
            created: post.created,
        }
    }
}

macro_rules! within_scope {
    ($query:expr, $scope:expr) => {
        match $scope {
            PostScope::All => $query,
            PostScope::Group(group_id) => $query.filter(posts::group_id.eq(group_id)),
            PostScope::Author(author_id) => $query.filter(posts::author_id.eq(author_id)),
            PostScope::FollowedBy(user_id) => $query.filter(
                posts::author_id.eq_any(
                    follows::table
                        .filter(follows::user_id.eq(user_id))
                        .select(follows::author_id),
                ),
            ),
        }
    };
}

pub fn count_posts(scope: PostScope, connection: &mut SqliteConnection) -> QueryResult<i64> {
    let query: posts::BoxedQuery<'_, Sqlite> = posts::table.into_boxed();
    within_scope!(query, scope).count().get_result(connection)
}

/// Newest first, ties broken by id so pages never overlap.
pub fn load_page(
    scope: PostScope,
    requested: Option<&str>,
    per_page: i64,
    connection: &mut SqliteConnection,
) -> QueryResult<Page<PostView>> {
    let total = count_posts(scope, connection)?;
    let window = Paginator::new(per_page).window(requested, total);

    let query = posts::table
        .inner_join(users::table)
        .left_join(groups::table)
        .select((
            posts::all_columns,
            users::username,
            groups::all_columns.nullable(),
        ))
        .into_boxed();
    let rows = within_scope!(query, scope)
        .order((posts::created.desc(), posts::id.desc()))
        .limit(window.limit())
        .offset(window.offset())
        .load::<PostRow>(connection)?;

    Ok(window.page(rows).map(PostView::from))
}

pub fn load_post_view(post_id: i32, connection: &mut SqliteConnection) -> Result<PostView, ApiError> {
    posts::table
        .inner_join(users::table)
        .left_join(groups::table)
        .filter(posts::id.eq(post_id))
        .select((
            posts::all_columns,
            users::username,
            groups::all_columns.nullable(),
        ))
        .first::<PostRow>(connection)
        .optional()?
        .map(PostView::from)
        .ok_or(ApiError::NotFound("post"))
}

/// Pages are cached under their resolved number, so out-of-range and
/// non-numeric requests never add entries of their own.
#[get("/posts?<page>")]
pub async fn index(
    db: Db,
    settings: &State<Settings>,
    cache: &State<PageCache>,
    page: Option<&str>,
) -> ApiResult<Value> {
    let number = requested_number(page);
    if let Some(cached) = cache.get(&PageCache::key("index", number)) {
        return Ok(Json(cached));
    }

    let requested = page.map(str::to_owned);
    let per_page = settings.page_size;
    let posts = db
        .run(move |connection| {
            Ok(load_page(PostScope::All, requested.as_deref(), per_page, connection)?)
        })
        .await?;
    let key = PageCache::key("index", posts.number);
    let body = json!({ "posts": posts });
    cache.insert(key, body.clone());
    Ok(Json(body))
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    posts: Page<PostView>,
}

#[get("/follow?<page>")]
pub async fn follow_index(
    user: CurrentUser,
    db: Db,
    settings: &State<Settings>,
    page: Option<&str>,
) -> ApiResult<FeedResponse> {
    let user = user?;
    let requested = page.map(str::to_owned);
    let per_page = settings.page_size;
    let posts = db
        .run(move |connection| {
            Ok(load_page(
                PostScope::FollowedBy(user.id),
                requested.as_deref(),
                per_page,
                connection,
            )?)
        })
        .await?;
    Ok(Json(FeedResponse { posts }))
}
