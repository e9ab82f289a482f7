#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use quire::permissions::MainAdminId;
use quire::Settings;

pub const MAIN_ADMIN: &str = "admin-main";

/// Settings pointing at `backend`, with `admin-main` as the main admin.
pub fn settings_for(backend: &MockServer) -> Settings {
    Settings {
        backend_url: backend.uri(),
        main_admin: MainAdminId::new(Some(MAIN_ADMIN.to_string())),
        ..Settings::default()
    }
}

/// Build the app service against `backend`.
#[macro_export]
macro_rules! quire_app {
    ($backend:expr) => {{
        let settings = $crate::common::settings_for(&$backend);
        let security = quire::SecurityHeaders::from_settings(&settings);
        let state = quire::AppState::new(settings).expect("templates load");
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(security)
                .app_data(actix_web::web::Data::new(state))
                .configure(quire::config),
        )
        .await
    }};
}

pub fn ok(payload: Value) -> ResponseTemplate {
    let mut body = json!({"success": true});
    if let (Some(body), Some(extra)) = (body.as_object_mut(), payload.as_object()) {
        body.extend(extra.clone());
    }
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn rejected(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"success": false, "message": message}))
}

pub fn user(id: &str, username: &str, role: &str) -> Value {
    json!({
        "_id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "role": role,
        "blocked": false,
        "createdAt": "2024-03-05T10:00:00Z"
    })
}

pub fn post(id: &str, title: &str, category: &str, text: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "category": category,
        "content": {"time": 1, "blocks": [{"type": "paragraph", "data": {"text": text}}], "version": "2.28.0"},
        "author": {"_id": "u1", "username": "ana"},
        "createdAt": "2024-03-05T10:00:00Z",
        "likes": [],
        "dislikes": [],
        "views": 7
    })
}

/// Answer `/api/user/me` for the `token=<token>` session with `user`.
pub async fn sign_in(backend: &MockServer, token: &str, user: Value) {
    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .and(header("cookie", format!("token={token}").as_str()))
        .respond_with(ok(json!({ "user": user })))
        .mount(backend)
        .await;
}

/// Multipart body with text fields and file parts. Returns the content type
/// and the encoded body.
pub fn multipart(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "quire-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

/// Matches requests whose raw body contains `needle`. Multipart bodies carry
/// binary file parts, so the body is searched as bytes.
pub struct BodyHas(pub &'static str);

impl Match for BodyHas {
    fn matches(&self, request: &Request) -> bool {
        let needle = self.0.as_bytes();
        request.body.windows(needle.len()).any(|w| w == needle)
    }
}

pub const PNG: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
