#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

use rocket::fs::FileServer;
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::Json;
use rocket::{catch, catchers, routes, Build, Rocket};
use serde_json::{json, Value};
use thiserror::Error;

pub mod cache;
pub mod comment;
pub mod config;
pub mod db;
pub mod feed;
pub mod group;
pub mod media;
pub mod pagination;
pub mod permissions;
pub mod post;
pub mod profile;
pub mod types;
pub mod users;
pub mod utils;

use cache::PageCache;
use config::Settings;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("database setup failed: {0}")]
    Database(#[from] db::Error),

    #[error("media directory unusable: {0}")]
    Media(#[from] std::io::Error),
}

#[catch(401)]
fn unauthorized(_req: &Request) -> Json<Value> {
    Json(json!({ "errors": { "status": "401 Unauthorized" } }))
}

#[catch(403)]
fn forbidden(_req: &Request) -> Json<Value> {
    Json(json!({ "errors": { "status": "403 Forbidden" } }))
}

#[catch(404)]
fn not_found(_req: &Request) -> Json<Value> {
    Json(json!({ "errors": ["entity not found"] }))
}

#[catch(422)]
fn unprocessable(_req: &Request) -> Json<Value> {
    Json(json!({ "errors": ["unprocessable entity"] }))
}

#[catch(default)]
fn fallback(status: Status, _req: &Request) -> Json<Value> {
    Json(json!({ "errors": [status.to_string()] }))
}

/// Builds the application: database pool with migrations applied, the index
/// page cache, and every route under `/api`.
pub fn rocket(settings: Settings) -> Result<Rocket<Build>, BootError> {
    let pool = db::init_pool(&settings.database_url)?;
    db::run_migrations(&pool)?;
    media::ensure_root(&settings.media_root)?;

    let page_cache = PageCache::new(settings.index_cache_ttl);
    let media_root = settings.media_root.clone();

    Ok(rocket::build()
        .manage(pool)
        .manage(page_cache)
        .manage(settings)
        .mount(
            "/api",
            routes![
                users::register,
                users::login,
                users::current,
                profile::profile,
                profile::follow,
                profile::unfollow,
                group::list,
                group::create,
                group::group_posts,
                feed::index,
                feed::follow_index,
                post::create,
                post::detail,
                post::edit,
                post::delete,
                post::upload_image,
                comment::add,
                comment::list,
                comment::delete,
            ],
        )
        .mount("/media", FileServer::from(media_root))
        .register(
            "/",
            catchers![unauthorized, forbidden, not_found, unprocessable, fallback],
        ))
}
