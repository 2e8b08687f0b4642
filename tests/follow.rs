mod common;

use common::{app, auth, texts};
use rocket::http::Status;

#[test]
fn following_adds_exactly_one_subscription() {
    let app = app();
    let follower = app.register("user");
    app.register("user_1");

    let profile = app.follow(&follower, "user_1");
    assert_eq!(profile["profile"]["following"], true);

    // Following again changes nothing.
    app.follow(&follower, "user_1");
    let page = app.get_as(&follower, "/api/profiles/user_1");
    assert_eq!(page["profile"]["following"], true);

    let anonymous = app.get("/api/profiles/user_1");
    assert_eq!(anonymous["profile"]["following"], false);
}

#[test]
fn unfollow_removes_subscription() {
    let app = app();
    let follower = app.register("user");
    app.register("user_1");
    app.follow(&follower, "user_1");

    let response = app
        .client
        .delete("/api/profiles/user_1/follow")
        .header(auth(&follower))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let page = app.get_as(&follower, "/api/profiles/user_1");
    assert_eq!(page["profile"]["following"], false);

    // Unfollowing someone not followed is harmless.
    let response = app
        .client
        .delete("/api/profiles/user_1/follow")
        .header(auth(&follower))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
}

#[test]
fn self_follow_is_ignored() {
    let app = app();
    let token = app.register("auth");
    app.create_post(&token, "My own post", None);

    let profile = app.follow(&token, "auth");
    assert_eq!(profile["profile"]["following"], false);

    let feed = app.get_as(&token, "/api/follow");
    assert!(texts(&feed["posts"]).is_empty());
}

#[test]
fn follow_requires_login_and_existing_author() {
    let app = app();
    let token = app.register("user");
    app.register("user_1");

    let response = app.client.post("/api/profiles/user_1/follow").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = app
        .client
        .post("/api/profiles/nobody/follow")
        .header(auth(&token))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn feed_shows_only_followed_authors() {
    let app = app();
    let follower = app.register("user");
    let followed = app.register("user_1");
    let stranger = app.register("StasBasov");

    app.follow(&follower, "user_1");
    app.create_post(&followed, "First from user_1", None);
    app.create_post(&stranger, "Not followed", None);
    app.create_post(&followed, "Second from user_1", None);

    let feed = app.get_as(&follower, "/api/follow");
    assert_eq!(
        texts(&feed["posts"]),
        ["Second from user_1", "First from user_1"]
    );

    // The followed author does not see their own posts in their feed.
    let other_feed = app.get_as(&followed, "/api/follow");
    assert!(texts(&other_feed["posts"]).is_empty());

    let response = app
        .client
        .delete("/api/profiles/user_1/follow")
        .header(auth(&follower))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let feed = app.get_as(&follower, "/api/follow");
    assert_eq!(feed["posts"]["count"], 0);
}
