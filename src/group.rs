use crate::config::Settings;
use crate::db::schema::groups;
use crate::db::Db;
use crate::feed::{self, PostScope, PostView};
use crate::pagination::Page;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::CurrentUser;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{insert_into, select};
use log::info;
use regex::Regex;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};
use slug::slugify;
use std::fmt;

pub const MAX_TITLE_LENGTH: usize = 200;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"\A[-a-zA-Z0-9_]+\z").expect("slug pattern compiles");
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = groups)]
pub struct Group {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub fn load_by_slug(slug_: &str, connection: &mut SqliteConnection) -> Result<Group, ApiError> {
        use crate::db::schema::groups::dsl::*;
        groups
            .filter(slug.eq(slug_))
            .first::<Group>(connection)
            .optional()?
            .ok_or(ApiError::NotFound("group"))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
pub struct NewGroup {
    title: String,
    slug: String,
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupDetails {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroup {
    group: GroupDetails,
}

impl Validate for CreateGroup {
    type Error = ApiError;
    fn validate(mut self, connection: &mut SqliteConnection) -> Result<Self, ApiError> {
        use crate::db::schema::groups::dsl::*;
        let mut error = ValidationError::default();

        self.group.title = self.group.title.trim().to_owned();
        if self.group.title.is_empty() {
            error.add_error("title", "empty title");
        } else if self.group.title.chars().count() > MAX_TITLE_LENGTH {
            error.add_error(
                "title",
                format!("title longer than {} characters", MAX_TITLE_LENGTH),
            );
        }

        let wanted = match self.group.slug.take() {
            Some(given) => given.trim().to_owned(),
            None => slugify(&self.group.title),
        };
        if !SLUG_RE.is_match(&wanted) {
            error.add_error(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens",
            );
        } else if select(exists(groups.filter(slug.eq(&wanted)))).get_result::<bool>(connection)? {
            error.add_error("slug", format!("Slug already taken: {}", wanted));
        }
        self.group.slug = Some(wanted);

        Ok(error.into_result(self)?)
    }
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    group: Group,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct GroupPage {
    group: Group,
    posts: Page<PostView>,
}

#[get("/groups")]
pub async fn list(db: Db) -> ApiResult<GroupsResponse> {
    let all = db
        .run(|connection| {
            Ok(groups::table
                .order(groups::title.asc())
                .load::<Group>(connection)?)
        })
        .await?;
    Ok(Json(GroupsResponse { groups: all }))
}

#[post("/groups", format = "json", data = "<create>")]
pub async fn create(
    user: CurrentUser,
    db: Db,
    create: Json<CreateGroup>,
) -> ApiResult<GroupResponse> {
    let user = user?;
    let create = create.into_inner();
    let group = db
        .run(move |connection| {
            let create = create.validate(connection)?;
            let new_group = NewGroup {
                title: create.group.title,
                slug: create.group.slug.unwrap_or_default(),
                description: create.group.description,
            };
            Ok(insert_into(groups::table)
                .values(&new_group)
                .get_result::<Group>(connection)?)
        })
        .await?;
    info!("{} created group {}", user.username, group.slug);
    Ok(Json(GroupResponse { group }))
}

#[get("/groups/<slug>?<page>")]
pub async fn group_posts(
    db: Db,
    settings: &State<Settings>,
    slug: &str,
    page: Option<&str>,
) -> ApiResult<GroupPage> {
    let slug = slug.to_owned();
    let requested = page.map(str::to_owned);
    let per_page = settings.page_size;
    let (group, posts) = db
        .run(move |connection| {
            let group = Group::load_by_slug(&slug, connection)?;
            let posts = feed::load_page(
                PostScope::Group(group.id),
                requested.as_deref(),
                per_page,
                connection,
            )?;
            Ok((group, posts))
        })
        .await?;
    Ok(Json(GroupPage { group, posts }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_title() {
        let group = Group {
            id: 1,
            title: "Test group".into(),
            slug: "test".into(),
            description: "Test description".into(),
        };
        assert_eq!(group.to_string(), "Test group");
    }

    #[test]
    fn slugs() {
        assert!(SLUG_RE.is_match("new_group-2"));
        assert!(!SLUG_RE.is_match("with space"));
        assert!(!SLUG_RE.is_match(""));
        assert!(SLUG_RE.is_match(&slugify("Тестовая группа")));
    }
}
