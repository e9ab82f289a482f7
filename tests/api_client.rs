use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quire::api::BackendClient;
use quire::error::{ApiError, NETWORK_MESSAGE};
use quire::models::Reaction;
use quire::session::Session;

#[tokio::test]
async fn forwards_session_cookie_and_decodes_envelope() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .and(header("cookie", "token=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "blogs": [{"_id": "p1", "title": "One", "content": {"blocks": []}}]
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    let posts = api.list_posts(&Session::with_token("abc")).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p1");
}

#[tokio::test]
async fn success_false_is_a_rejection_even_with_200() {
    let backend = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/comments/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Only the main admin can delete comments"
        })))
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    let err = api.delete_comment(&Session::with_token("abc"), "c1").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 200, .. }));
    assert_eq!(err.user_message("Failed to delete comment"), "Only the main admin can delete comments");
}

#[tokio::test]
async fn rejection_without_message_uses_fallback() {
    let backend = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/admin/account/u1/block"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    let err = api.toggle_block(&Session::with_token("abc"), "u1").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message("Action failed"), "Action failed");
}

#[tokio::test]
async fn reactions_return_fresh_tally() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/posts/p1/dislike"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "likes": 4, "dislikes": 2})))
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    let tally = api.react_to_post(&Session::with_token("abc"), "p1", Reaction::Dislike).await.unwrap();
    assert_eq!((tally.likes, tally.dislikes), (4, 2));
}

#[tokio::test]
async fn non_json_reply_is_a_decode_error() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/all-accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    let err = api.all_accounts(&Session::with_token("abc")).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn expired_session_reads_as_anonymous() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"success": false, "message": "Not authorized"})))
        .mount(&backend)
        .await;

    let api = BackendClient::new(&backend.uri());
    assert_eq!(api.current_user(&Session::with_token("stale")).await.unwrap(), None);
    assert_eq!(api.current_user(&Session::anonymous()).await.unwrap(), None);
}

#[tokio::test]
async fn unreachable_backend_is_a_retryable_network_error() {
    // nothing listens on the discard port
    let api = BackendClient::new("http://127.0.0.1:9");
    let err = api.list_posts(&Session::anonymous()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.user_message("ignored"), NETWORK_MESSAGE);
}
