#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{ok, post, rejected};

async fn body_text<B: actix_web::body::MessageBody>(resp: actix_web::dev::ServiceResponse<B>) -> String
where
    B::Error: std::fmt::Debug,
{
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

async fn mount_posts(backend: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ok(json!({"blogs": [
            post("p1", "Rust ownership", "Tech", "Borrowing rules explained"),
            post("p2", "Sourdough", "Food", "Flour water salt"),
            post("p3", "Async Rust", "Tech", "Futures and executors"),
        ]})))
        .mount(backend)
        .await;
}

#[actix_web::test]
async fn home_features_latest_post() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Featured"));
    assert!(html.contains("Rust ownership"));
    assert!(html.contains("Sourdough"));
    assert!(html.contains("/assets/quire.js"));
}

#[actix_web::test]
async fn blog_filters_by_category_and_search() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    let app = quire_app!(backend);

    let req = test::TestRequest::get().uri("/blog?category=Food").to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Sourdough"));
    assert!(!html.contains("Async Rust"));

    let req = test::TestRequest::get().uri("/blog?q=executors").to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("Async Rust"));
    assert!(!html.contains("Sourdough"));
    assert!(html.contains("1 result for"));
}

#[actix_web::test]
async fn read_page_renders_fallback_widget_and_comments() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    Mock::given(method("GET"))
        .and(path("/api/posts/p1"))
        .respond_with(ok(json!({"blog": post("p1", "Rust ownership", "Tech", "Borrowing rules explained")})))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/comments/p1"))
        .respond_with(ok(json!({"comments": [{
            "_id": "c1",
            "userId": {"_id": "u2", "username": "ben"},
            "username": "ben",
            "text": "Great read",
            "likes": ["u1"],
            "dislikes": [],
            "blocked": true
        }]})))
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/p1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<p>Borrowing rules explained</p>"));
    assert!(html.contains("\"holder\":\"reader-p1\""));
    assert!(html.contains("\"readOnly\":true"));
    assert!(html.contains("Great read"));
    assert!(html.contains("badge blocked"));
    assert!(html.contains("Log in to react"));
    assert!(!html.contains("Edit post"));
}

#[actix_web::test]
async fn unparseable_body_is_shown_as_text() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    Mock::given(method("GET"))
        .and(path("/api/posts/p9"))
        .respond_with(ok(json!({"blog": {"_id": "p9", "title": "Legacy", "content": "{not json"}})))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/comments/p9"))
        .respond_with(ok(json!({"comments": []})))
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/p9").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<pre class=\"content-plain\">{not json</pre>"));
    assert!(!html.contains("widget-mount"));
}

#[actix_web::test]
async fn missing_post_and_unknown_path_render_not_found() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    Mock::given(method("GET"))
        .and(path("/api/posts/gone"))
        .respond_with(rejected(404, "Blog not found"))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/comments/gone"))
        .respond_with(ok(json!({"comments": []})))
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/blog/gone").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("does not exist"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/no/such/page").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("Back to home"));
}

#[actix_web::test]
async fn backend_failure_renders_recoverable_error_page() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&backend)
        .await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(resp).await.contains("Reload page"));
}

#[actix_web::test]
async fn theme_cookie_switches_layout() {
    let backend = MockServer::start().await;
    mount_posts(&backend).await;
    let app = quire_app!(backend);

    let req = test::TestRequest::post().uri("/theme").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = resp.response().cookies().find(|c| c.name() == "theme").unwrap();
    assert_eq!(cookie.value(), "dark");

    let req = test::TestRequest::get()
        .uri("/")
        .cookie(Cookie::new("theme", "dark"))
        .to_request();
    let html = body_text(test::call_service(&app, req).await).await;
    assert!(html.contains("data-theme=\"dark\""));
}

#[actix_web::test]
async fn assets_are_served() {
    let backend = MockServer::start().await;
    let app = quire_app!(backend);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/assets/quire.js").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("widget-mount"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/assets/nope.js").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
