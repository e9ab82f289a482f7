#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header as has_header, header_regex, method, path};
use wiremock::{Mock, MockServer};

use common::{location, multipart, ok, rejected, sign_in, user, BodyHas, PNG};

#[actix_web::test]
async fn login_relays_backend_session_cookie() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .and(body_string_contains("ana@example.com"))
        .respond_with(
            ok(json!({"user": user("u1", "ana", "user")}))
                .insert_header("set-cookie", "token=fresh; Path=/api; HttpOnly; Max-Age=3600"),
        )
        .expect(1)
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "ana@example.com"), ("password", "secret")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let cookie = resp.response().cookies().find(|c| c.name() == "token").unwrap();
    assert_eq!(cookie.value(), "fresh");
    assert_eq!(cookie.path(), Some("/"));
}

#[actix_web::test]
async fn rejected_login_shows_backend_message() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(rejected(401, "Invalid credentials"))
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "ana@example.com"), ("password", "wrong")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/login?error=Invalid%20credentials");

    let req = test::TestRequest::get().uri("/login?error=Invalid%20credentials").to_request();
    let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(html.contains("Invalid credentials"));
}

#[actix_web::test]
async fn register_forwards_multipart_fields() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/register"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(BodyHas("name=\"username\""))
        .and(BodyHas("newbie@example.com"))
        .and(BodyHas("name=\"profileImage\""))
        .respond_with(
            ok(json!({"user": user("u9", "newbie", "user")})).insert_header("set-cookie", "token=t9; Path=/"),
        )
        .expect(1)
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let (content_type, body) = multipart(
        &[("email", "newbie@example.com"), ("username", "newbie"), ("password", "secret1")],
        &[("profileImage", "me.png", &PNG)],
    );
    let req = test::TestRequest::post()
        .uri("/register")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/");
    assert!(resp.response().cookies().any(|c| c.name() == "token" && c.value() == "t9"));
}

#[actix_web::test]
async fn logout_clears_session_even_when_backend_is_down() {
    let backend = MockServer::start().await;
    let app = quire_app!(backend);
    drop(backend);

    let req = test::TestRequest::post()
        .uri("/logout")
        .cookie(Cookie::new("token", "abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = resp.response().cookies().find(|c| c.name() == "token").unwrap();
    assert_eq!(cookie.value(), "");
}

#[actix_web::test]
async fn profile_requires_sign_in() {
    let backend = MockServer::start().await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/profile").to_request()).await;
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn own_profile_shows_email_and_forms() {
    let backend = MockServer::start().await;
    sign_in(&backend, "abc", user("u1", "ana", "user")).await;
    let app = quire_app!(backend);

    let req = test::TestRequest::get()
        .uri("/profile")
        .cookie(Cookie::new("token", "abc"))
        .to_request();
    let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(html.contains("ana@example.com"));
    assert!(html.contains("Change password"));
    assert!(html.contains("Mar 5, 2024"));
}

#[actix_web::test]
async fn password_mismatch_never_reaches_backend() {
    let backend = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/change-password"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let req = test::TestRequest::post()
        .uri("/profile/password")
        .cookie(Cookie::new("token", "abc"))
        .set_form([
            ("current_password", "old"),
            ("new_password", "abcdef"),
            ("confirm_password", "abcdeg"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/profile?error=New%20passwords%20do%20not%20match");
}

#[actix_web::test]
async fn password_change_sends_camel_case_json() {
    let backend = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/change-password"))
        .and(has_header("cookie", "token=abc"))
        .and(body_string_contains("\"currentPassword\":\"old\""))
        .respond_with(ok(json!({"message": "Password updated"})))
        .expect(1)
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let req = test::TestRequest::post()
        .uri("/profile/password")
        .cookie(Cookie::new("token", "abc"))
        .set_form([
            ("current_password", "old"),
            ("new_password", "abcdef"),
            ("confirm_password", "abcdef"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/profile?notice=Password%20updated");
}
