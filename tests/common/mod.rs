#![allow(dead_code)]

use blog::config::Settings;
use diesel::{Connection, SqliteConnection};
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::{json, Value};
use tempfile::TempDir;

/// An application on its own SQLite file, removed when dropped.
pub struct TestApp {
    pub client: Client,
    pub dir: TempDir,
    database_url: String,
}

pub fn app() -> TestApp {
    app_with(|_| {})
}

pub fn app_with<F: FnOnce(&mut Settings)>(tweak: F) -> TestApp {
    let dir = tempfile::tempdir().expect("temporary directory");
    let mut settings = Settings::new(dir.path().join("blog.sqlite3").to_string_lossy());
    settings.media_root = dir.path().join("media");
    settings.password_rounds = 1_000;
    tweak(&mut settings);
    let database_url = settings.database_url.clone();

    let rocket = blog::rocket(settings).expect("application builds");
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestApp {
        client,
        dir,
        database_url,
    }
}

pub fn auth(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Token {}", token))
}

pub fn json_body(response: LocalResponse) -> Value {
    response.into_json::<Value>().expect("json body")
}

/// The smallest GIF: one transparent pixel wide, two high.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

impl TestApp {
    /// A direct connection to the application's database.
    pub fn connection(&self) -> SqliteConnection {
        SqliteConnection::establish(&self.database_url).expect("database opens")
    }

    /// Path of a stored image, relative to the media root.
    pub fn media_path(&self, image: &str) -> std::path::PathBuf {
        self.dir.path().join("media").join(image)
    }

    /// Uploads `SMALL_GIF` as the post's image and returns the stored path.
    pub fn upload_gif(&self, token: &str, post: i64) -> String {
        let response = self
            .client
            .put(format!("/api/posts/{}/image", post))
            .header(ContentType::GIF)
            .header(auth(token))
            .body(SMALL_GIF)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_body(response)["post"]["image"]
            .as_str()
            .expect("image path")
            .to_owned()
    }

    /// Registers `username` and returns its token.
    pub fn register(&self, username: &str) -> String {
        let response = self
            .client
            .post("/api/users")
            .header(ContentType::JSON)
            .body(
                json!({ "user": {
                    "username": username,
                    "email": format!("{}@example.com", username.to_lowercase()),
                    "password": "s3cret-pass",
                }})
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response);
        body["user"]["token"]
            .as_str()
            .expect("token in response")
            .to_owned()
    }

    pub fn create_group(&self, token: &str, title: &str, slug: &str) -> i64 {
        let response = self
            .client
            .post("/api/groups")
            .header(ContentType::JSON)
            .header(auth(token))
            .body(json!({ "group": { "title": title, "slug": slug, "description": "Test description" } }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_body(response)["group"]["id"]
            .as_i64()
            .expect("group id")
    }

    pub fn try_create_post(&self, token: &str, text: &str, group: Option<i64>) -> LocalResponse<'_> {
        self.client
            .post("/api/posts")
            .header(ContentType::JSON)
            .header(auth(token))
            .body(json!({ "post": { "text": text, "group": group } }).to_string())
            .dispatch()
    }

    pub fn create_post(&self, token: &str, text: &str, group: Option<i64>) -> i64 {
        let response = self.try_create_post(token, text, group);
        assert_eq!(response.status(), Status::Ok);
        json_body(response)["post"]["id"]
            .as_i64()
            .expect("post id")
    }

    pub fn get(&self, uri: &str) -> Value {
        let response = self.client.get(uri.to_owned()).dispatch();
        assert_eq!(response.status(), Status::Ok, "GET {}", uri);
        json_body(response)
    }

    pub fn get_as(&self, token: &str, uri: &str) -> Value {
        let response = self.client.get(uri.to_owned()).header(auth(token)).dispatch();
        assert_eq!(response.status(), Status::Ok, "GET {}", uri);
        json_body(response)
    }

    pub fn follow(&self, token: &str, username: &str) -> Value {
        let response = self
            .client
            .post(format!("/api/profiles/{}/follow", username))
            .header(auth(token))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_body(response)
    }
}

/// Texts of the posts in a listing, in order.
pub fn texts(listing: &Value) -> Vec<String> {
    listing["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|post| post["text"].as_str().expect("post text").to_owned())
        .collect()
}
