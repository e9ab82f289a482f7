use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::BackendClient;
use crate::config::Settings;
use crate::content::widget::{EditorJsFactory, WidgetSlot};
use crate::error::PageError;
use crate::forms::MultipartForm;
use crate::models::{NewComment, Reaction, Role, User};
use crate::permissions::{Action, Gate};
use crate::preferences::Preferences;
use crate::session::{clear_session_cookie, relay_cookie, Session, Viewer, SESSION_COOKIE};
use crate::templates::{Layout, Templates};
use crate::views::account::{validate_profile_update, validate_registration, LoginForm, PasswordForm, ProfileView};
use crate::views::admin::{account_rows, apply, AccountDetail, AccountRow, AdminContext, AdminTab, Mutation, Outcome};
use crate::views::comments::{validate_comment, CommentSection};
use crate::views::editor::{upload_for_widget, EditorSubmission, PostEditor, UploadReply};
use crate::views::listing::{BlogListing, HomeView, ListingFilter};
use crate::views::reader::{mount_reader, ReaderView};
use crate::views::{Flash, ViewScope};

const QUIRE_JS: &str = include_str!("../assets/quire.js");
const QUIRE_CSS: &str = include_str!("../assets/quire.css");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/blog").route(web::get().to(blog)))
        .service(web::resource("/blog/{id}").route(web::get().to(read_post)))
        .service(web::resource("/blog/{id}/like").route(web::post().to(like_post)))
        .service(web::resource("/blog/{id}/dislike").route(web::post().to(dislike_post)))
        .service(web::resource("/blog/{id}/comments").route(web::post().to(add_comment)))
        .service(web::resource("/comments/{id}/like").route(web::post().to(like_comment)))
        .service(web::resource("/comments/{id}/dislike").route(web::post().to(dislike_comment)))
        .service(web::resource("/comments/{id}/delete").route(web::post().to(delete_comment)))
        .service(
            web::resource("/login")
                .route(web::get().to(login_page))
                .route(web::post().to(login)),
        )
        .service(
            web::resource("/register")
                .route(web::get().to(register_page))
                .route(web::post().to(register)),
        )
        .service(web::resource("/logout").route(web::post().to(logout)))
        .service(web::resource("/theme").route(web::post().to(toggle_theme)))
        .service(
            web::resource("/profile")
                .route(web::get().to(my_profile))
                .route(web::post().to(update_profile)),
        )
        .service(web::resource("/profile/password").route(web::post().to(change_password)))
        .service(web::resource("/profile/{id}").route(web::get().to(public_profile)))
        .service(
            web::resource("/create-post")
                .route(web::get().to(editor_page))
                .route(web::post().to(submit_post)),
        )
        .service(web::resource("/editor/upload-image").route(web::post().to(editor_upload)))
        .service(web::resource("/admin").route(web::get().to(admin_dashboard)))
        .service(web::resource("/admin/accounts").route(web::get().to(admin_accounts)))
        .service(web::resource("/admin/accounts/{id}").route(web::get().to(admin_account_detail)))
        .service(web::resource("/admin/users/{id}/block").route(web::post().to(admin_toggle_block)))
        .service(web::resource("/admin/users/{id}/role").route(web::post().to(admin_set_role)))
        .service(web::resource("/admin/users/{id}/delete").route(web::post().to(admin_delete_user)))
        .service(web::resource("/admin/posts/{id}/delete").route(web::post().to(admin_delete_post)))
        .service(web::resource("/admin/comments/{id}/delete").route(web::post().to(admin_delete_comment)))
        .service(web::resource("/admin/account").route(web::post().to(admin_update_account)))
        .service(web::resource("/admin/account/password").route(web::post().to(admin_change_password)))
        .service(web::resource("/assets/{file}").route(web::get().to(asset)))
        .default_service(web::route().to(not_found));
}

#[derive(Clone)]
pub struct AppState {
    pub api: BackendClient,
    pub settings: Arc<Settings>,
    pub templates: Arc<Templates>,
    pub widgets: EditorJsFactory,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, tera::Error> {
        Ok(Self {
            api: BackendClient::new(&settings.backend_url),
            widgets: EditorJsFactory::new(settings.editor_cdn.clone()),
            templates: Arc::new(Templates::new()?),
            settings: Arc::new(settings),
        })
    }

    fn gate<'a>(&'a self, viewer: &'a Viewer) -> Gate<'a> {
        Gate::new(viewer.user.as_ref(), &self.settings.main_admin)
    }
}

// ---------- helpers ----------

fn see_other(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

fn flash_of(req: &HttpRequest) -> Flash {
    web::Query::<Flash>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default()
}

fn render<T: Serialize>(state: &AppState, template: &str, layout: &Layout, page: &T) -> Result<HttpResponse, PageError> {
    let html = state.templates.render(template, layout, page)?;
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html))
}

fn not_found_page(state: &AppState, req: &HttpRequest, viewer: &Viewer, prefs: &Preferences) -> Result<HttpResponse, PageError> {
    let layout = Layout::new("Not found", prefs, viewer.user.as_ref(), flash_of(req));
    let html = state.templates.render("not_found.html", &layout, &())?;
    Ok(HttpResponse::NotFound().content_type("text/html; charset=utf-8").body(html))
}

/// Redirect that also hands the backend's session cookies to the browser.
fn redirect_with_cookies(location: &str, set_cookies: &[String]) -> HttpResponse {
    let mut res = HttpResponse::SeeOther();
    res.insert_header((header::LOCATION, location));
    for cookie in set_cookies.iter().filter_map(|raw| relay_cookie(raw)) {
        res.cookie(cookie);
    }
    res.finish()
}

/// Path of the referring page when it is on this host.
fn local_referer(req: &HttpRequest) -> String {
    let host = req.connection_info().host().to_string();
    req.headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| r.split_once("://"))
        .and_then(|(_, rest)| rest.strip_prefix(host.as_str()))
        .filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\"))
        .map(str::to_string)
        .unwrap_or_else(|| "/".to_string())
}

fn post_path(id: &str) -> String {
    format!("/blog/{}", urlencoding::encode(id))
}

/// Signed-in admin, or the redirect to send instead.
fn require_admin(viewer: &Viewer) -> Result<&User, HttpResponse> {
    match &viewer.user {
        None => Err(see_other("/login")),
        Some(user) if user.is_admin() => Ok(user),
        Some(_) => Err(see_other(Flash::error("Admins only").redirect_to("/"))),
    }
}

// ---------- reading ----------

pub async fn home(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    let posts = state.api.list_posts(&viewer.session).await?;
    let layout = Layout::new("Home", &prefs, viewer.user.as_ref(), flash_of(&req));
    render(&state, "home.html", &layout, &HomeView::build(&posts))
}

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    category: Option<String>,
}

pub async fn blog(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    query: web::Query<BlogQuery>,
) -> Result<HttpResponse, PageError> {
    let posts = state.api.list_posts(&viewer.session).await?;
    let filter = ListingFilter::new(Some(prefs.query.clone()), query.into_inner().category);
    let listing = BlogListing::build(&posts, &filter);
    let layout = Layout::new("Blog", &prefs, viewer.user.as_ref(), flash_of(&req));
    render(&state, "blog.html", &layout, &listing)
}

#[derive(Serialize)]
struct ReadPage {
    post: ReaderView,
    comments: CommentSection,
}

pub async fn read_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    path: web::Path<String>,
) -> Result<HttpResponse, PageError> {
    let id = path.into_inner();
    let session = &viewer.session;
    let (post, all, comments) = futures_util::join!(
        state.api.get_post(session, &id),
        state.api.list_posts(session),
        state.api.comments_for(session, &id)
    );
    let post = match post {
        Ok(post) => post,
        Err(e) if e.is_not_found() => return not_found_page(&state, &req, &viewer, &prefs),
        Err(e) => return Err(e.into()),
    };
    let all = all.unwrap_or_else(|e| {
        warn!(error = %e, "sidebar posts unavailable");
        Vec::new()
    });
    let gate = state.gate(&viewer);

    let mut slot = WidgetSlot::new(state.widgets.clone());
    let widget = mount_reader(&mut slot, &post).await.unwrap_or_else(|e| {
        warn!(post = %post.id, error = %e, "reader widget not mounted, serving fallback only");
        None
    });

    let comments = match comments {
        Ok(comments) => CommentSection::build(&id, &comments, &gate),
        Err(e) => {
            warn!(post = %id, error = %e, "comments unavailable");
            CommentSection::unavailable(&id, &gate, e.user_message("Failed to load comments"))
        }
    };
    let page = ReadPage { post: ReaderView::build(&post, &all, &gate, widget), comments };
    let layout = Layout::new(post.title.clone(), &prefs, viewer.user.as_ref(), flash_of(&req));
    render(&state, "read.html", &layout, &page)
}

async fn react_to_post(state: &AppState, session: Session, id: String, reaction: Reaction) -> HttpResponse {
    if session.is_anonymous() {
        return see_other("/login");
    }
    match state.api.react_to_post(&session, &id, reaction).await {
        Ok(tally) => {
            info!(post = %id, likes = tally.likes, dislikes = tally.dislikes, "reaction recorded");
            see_other(post_path(&id))
        }
        Err(e) => {
            warn!(post = %id, error = %e, "reaction rejected");
            see_other(Flash::error(e.user_message("Action failed")).redirect_to(&post_path(&id)))
        }
    }
}

pub async fn like_post(state: web::Data<AppState>, session: Session, path: web::Path<String>) -> HttpResponse {
    react_to_post(&state, session, path.into_inner(), Reaction::Like).await
}

pub async fn dislike_post(state: web::Data<AppState>, session: Session, path: web::Path<String>) -> HttpResponse {
    react_to_post(&state, session, path.into_inner(), Reaction::Dislike).await
}

// ---------- comments ----------

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    text: String,
}

pub async fn add_comment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    form: web::Form<CommentForm>,
) -> HttpResponse {
    let post_id = path.into_inner();
    if session.is_anonymous() {
        return see_other("/login");
    }
    let back = post_path(&post_id);
    let flash = match validate_comment(&form.text) {
        Err(e) => Flash::error(e.to_string()),
        Ok(text) => match state.api.post_comment(&session, &post_id, &NewComment { text }).await {
            Ok(ack) => Flash::notice(ack.message_or("Comment posted")),
            Err(e) => {
                warn!(post = %post_id, error = %e, "comment rejected");
                Flash::error(e.user_message("Failed to post comment"))
            }
        },
    };
    see_other(format!("{}#comments", flash.redirect_to(&back)))
}

#[derive(Debug, Deserialize)]
pub struct CommentBack {
    post: Option<String>,
}

impl CommentBack {
    fn location(&self, flash: Flash) -> String {
        match &self.post {
            Some(post) => format!("{}#comments", flash.redirect_to(&post_path(post))),
            None => flash.redirect_to("/"),
        }
    }
}

async fn react_to_comment(state: &AppState, session: Session, id: String, back: CommentBack, reaction: Reaction) -> HttpResponse {
    if session.is_anonymous() {
        return see_other("/login");
    }
    // the thread is loaded again on the next page
    let flash = match state.api.react_to_comment(&session, &id, reaction).await {
        Ok(_) => Flash::default(),
        Err(e) => {
            warn!(comment = %id, error = %e, "comment reaction rejected");
            Flash::error(e.user_message("Action failed"))
        }
    };
    see_other(back.location(flash))
}

pub async fn like_comment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    back: web::Query<CommentBack>,
) -> HttpResponse {
    react_to_comment(&state, session, path.into_inner(), back.into_inner(), Reaction::Like).await
}

pub async fn dislike_comment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    back: web::Query<CommentBack>,
) -> HttpResponse {
    react_to_comment(&state, session, path.into_inner(), back.into_inner(), Reaction::Dislike).await
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    back: web::Query<CommentBack>,
) -> HttpResponse {
    if session.is_anonymous() {
        return see_other("/login");
    }
    let id = path.into_inner();
    let flash = match state.api.delete_comment(&session, &id).await {
        Ok(ack) => Flash::notice(ack.message_or("Comment deleted")),
        Err(e) => {
            warn!(comment = %id, error = %e, "comment delete rejected");
            Flash::error(e.user_message("Failed to delete comment"))
        }
    };
    see_other(back.location(flash))
}

// ---------- accounts ----------

pub async fn login_page(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    if viewer.is_signed_in() {
        return Ok(see_other("/"));
    }
    let layout = Layout::new("Log in", &prefs, None, flash_of(&req));
    render(&state, "login.html", &layout, &())
}

pub async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> HttpResponse {
    let form = form.into_inner();
    if let Err(e) = form.validate() {
        return see_other(Flash::error(e.to_string()).redirect_to("/login"));
    }
    match state.api.login(form.email.trim(), &form.password).await {
        Ok(signed_in) => {
            info!(user = %signed_in.value.username, "signed in");
            redirect_with_cookies("/", &signed_in.set_cookies)
        }
        Err(e) => {
            warn!(error = %e, "login rejected");
            see_other(Flash::error(e.user_message("Login failed")).redirect_to("/login"))
        }
    }
}

pub async fn register_page(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    if viewer.is_signed_in() {
        return Ok(see_other("/"));
    }
    let layout = Layout::new("Sign up", &prefs, None, flash_of(&req));
    render(&state, "register.html", &layout, &())
}

pub async fn register(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let mut form = match MultipartForm::read(payload).await {
        Ok(form) => form,
        Err(e) => return see_other(Flash::error(e.to_string()).redirect_to("/register")),
    };
    let image = form.take_file("profileImage");
    let registration = match validate_registration(form.text("email"), form.text("username"), form.text("password"), image) {
        Ok(registration) => registration,
        Err(e) => return see_other(Flash::error(e.to_string()).redirect_to("/register")),
    };
    match state.api.register(registration).await {
        Ok(created) => {
            info!(user = %created.value.username, "account registered");
            redirect_with_cookies("/", &created.set_cookies)
        }
        Err(e) => {
            warn!(error = %e, "registration rejected");
            see_other(Flash::error(e.user_message("Registration failed")).redirect_to("/register"))
        }
    }
}

pub async fn logout(state: web::Data<AppState>, session: Session) -> HttpResponse {
    let relayed = match state.api.logout(&session).await {
        Ok(reply) => reply.set_cookies,
        Err(e) => {
            warn!(error = %e, "backend logout failed, clearing cookie locally");
            Vec::new()
        }
    };
    let mut res = HttpResponse::SeeOther();
    res.insert_header((header::LOCATION, "/"));
    let mut cleared = false;
    for cookie in relayed.iter().filter_map(|raw| relay_cookie(raw)) {
        cleared |= cookie.name() == SESSION_COOKIE;
        res.cookie(cookie);
    }
    if !cleared {
        res.cookie(clear_session_cookie());
    }
    res.finish()
}

pub async fn toggle_theme(req: HttpRequest, prefs: Preferences) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, local_referer(&req)))
        .cookie(prefs.theme.toggled().cookie())
        .finish()
}

#[derive(Serialize)]
struct ProfilePage {
    profile: ProfileView,
    update_action: &'static str,
    password_action: &'static str,
}

impl ProfilePage {
    fn own(user: &User) -> Self {
        Self {
            profile: ProfileView::build(user, true),
            update_action: "/profile",
            password_action: "/profile/password",
        }
    }
}

pub async fn my_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    let Some(user) = &viewer.user else {
        return Ok(see_other("/login"));
    };
    let layout = Layout::new("Profile", &prefs, Some(user), flash_of(&req));
    render(&state, "profile.html", &layout, &ProfilePage::own(user))
}

pub async fn public_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    path: web::Path<String>,
) -> Result<HttpResponse, PageError> {
    let id = path.into_inner();
    if viewer.user.as_ref().map_or(false, |u| u.id == id) {
        return Ok(see_other("/profile"));
    }
    let user = match state.api.public_profile(&viewer.session, &id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return not_found_page(&state, &req, &viewer, &prefs),
        Err(e) => return Err(e.into()),
    };
    let page = ProfilePage {
        profile: ProfileView::build(&user, false),
        update_action: "/profile",
        password_action: "/profile/password",
    };
    let layout = Layout::new(user.username.clone(), &prefs, viewer.user.as_ref(), flash_of(&req));
    render(&state, "profile.html", &layout, &page)
}

async fn save_profile(state: &AppState, viewer: Viewer, payload: Multipart, back: &str) -> HttpResponse {
    let Some(user) = &viewer.user else {
        return see_other("/login");
    };
    let mut form = match MultipartForm::read(payload).await {
        Ok(form) => form,
        Err(e) => return see_other(Flash::error(e.to_string()).redirect_to(back)),
    };
    let image = form.take_file("profileImage");
    let update = match validate_profile_update(user, form.text("username"), image) {
        Ok(update) => update,
        Err(e) => return see_other(Flash::error(e.to_string()).redirect_to(back)),
    };
    let flash = match state.api.update_me(&viewer.session, update).await {
        Ok(updated) => {
            info!(user = %updated.id, "profile updated");
            Flash::notice("Profile updated successfully")
        }
        Err(e) => {
            warn!(user = %user.id, error = %e, "profile update rejected");
            Flash::error(e.user_message("Failed to update profile"))
        }
    };
    see_other(flash.redirect_to(back))
}

async fn save_password(state: &AppState, session: Session, form: PasswordForm, back: &str) -> HttpResponse {
    if session.is_anonymous() {
        return see_other("/login");
    }
    let change = match form.validate() {
        Ok(change) => change,
        Err(e) => return see_other(Flash::error(e.to_string()).redirect_to(back)),
    };
    let flash = match state.api.change_password(&session, &change).await {
        Ok(ack) => Flash::notice(ack.message_or("Password changed successfully")),
        Err(e) => {
            warn!(error = %e, "password change rejected");
            Flash::error(e.user_message("Failed to change password"))
        }
    };
    see_other(flash.redirect_to(back))
}

pub async fn update_profile(state: web::Data<AppState>, viewer: Viewer, payload: Multipart) -> HttpResponse {
    save_profile(&state, viewer, payload, "/profile").await
}

pub async fn change_password(state: web::Data<AppState>, session: Session, form: web::Form<PasswordForm>) -> HttpResponse {
    save_password(&state, session, form.into_inner(), "/profile").await
}

// ---------- authoring ----------

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    edit: Option<String>,
}

pub async fn editor_page(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    query: web::Query<EditQuery>,
) -> Result<HttpResponse, PageError> {
    let gate = state.gate(&viewer);
    if viewer.user.is_none() {
        return Ok(see_other("/login"));
    }
    if !gate.allows(Action::CreatePost) {
        return Ok(see_other(Flash::error("Only admins can write posts").redirect_to("/")));
    }
    let existing = match query.into_inner().edit.filter(|id| !id.is_empty()) {
        None => None,
        Some(id) => match state.api.get_post(&viewer.session, &id).await {
            Ok(post) => Some(post),
            Err(e) if e.is_not_found() => return not_found_page(&state, &req, &viewer, &prefs),
            Err(e) => return Err(e.into()),
        },
    };
    let mut editor = PostEditor::new(state.widgets.clone());
    let view = editor
        .load(existing.as_ref())
        .await
        .map_err(|e| PageError::Internal(format!("editor could not be mounted: {e}")))?;
    let title = if existing.is_some() { "Edit post" } else { "New post" };
    let layout = Layout::new(title, &prefs, viewer.user.as_ref(), flash_of(&req));
    render(&state, "editor.html", &layout, &view)
}

pub async fn submit_post(
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    payload: Multipart,
) -> Result<HttpResponse, PageError> {
    if viewer.user.is_none() {
        return Ok(see_other("/login"));
    }
    let mut form = match MultipartForm::read(payload).await {
        Ok(form) => form,
        Err(e) => return Ok(see_other(Flash::error(e.to_string()).redirect_to("/create-post"))),
    };
    let mut submission = EditorSubmission::from_form(&mut form);
    let mut editor = PostEditor::new(state.widgets.clone());

    let error = match editor.save(&mut submission).await {
        Err(e) => e.to_string(),
        Ok(new_post) => {
            let result = match &submission.edit_id {
                Some(id) => state.api.update_post(&viewer.session, id, new_post).await,
                None => state.api.create_post(&viewer.session, new_post).await,
            };
            let editing = submission.edit_id.is_some();
            match result {
                Ok(post) => {
                    info!(post = %post.id, editing, "post saved");
                    let notice = if editing { "Post updated successfully" } else { "Post published successfully" };
                    return Ok(see_other(Flash::notice(notice).redirect_to(&post_path(&post.id))));
                }
                Err(e) => {
                    warn!(error = %e, editing, "post save rejected");
                    e.user_message(if editing { "Failed to update post" } else { "Failed to create post" })
                }
            }
        }
    };
    let title = if submission.edit_id.is_some() { "Edit post" } else { "New post" };
    let view = editor.reopen(&submission, error).await;
    let layout = Layout::new(title, &prefs, viewer.user.as_ref(), Flash::default());
    render(&state, "editor.html", &layout, &view)
}

pub async fn editor_upload(state: web::Data<AppState>, session: Session, payload: Multipart) -> HttpResponse {
    let reply = match MultipartForm::read(payload).await {
        Err(e) => {
            warn!(error = %e, "editor upload unreadable");
            UploadReply::failed(e.to_string())
        }
        Ok(mut form) => match form.take_file("image") {
            None => UploadReply::failed("No image provided"),
            Some(upload) => upload_for_widget(&state.api, &session, upload).await,
        },
    };
    HttpResponse::Ok().json(reply)
}

// ---------- admin ----------

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    tab: Option<String>,
}

pub async fn admin_dashboard(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    query: web::Query<AdminQuery>,
) -> Result<HttpResponse, PageError> {
    let caller = match require_admin(&viewer) {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let tab = AdminTab::parse(query.tab.as_deref());
    let ctx = AdminContext {
        api: &state.api,
        session: &viewer.session,
        caller,
        main_admin: &state.settings.main_admin,
    };
    let scope = ViewScope::new();
    let _open = scope.guard();
    let page = ctx
        .load(tab, &prefs.query, &scope)
        .await
        .ok_or_else(|| PageError::Internal("admin view closed before its data arrived".into()))?;
    let layout = Layout::new("Admin", &prefs, Some(caller), flash_of(&req));
    render(&state, "admin.html", &layout, &page)
}

#[derive(Serialize)]
struct AccountsPage {
    rows: Vec<AccountRow>,
    error: Option<String>,
}

pub async fn admin_accounts(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    let caller = match require_admin(&viewer) {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let page = match state.api.all_accounts(&viewer.session).await {
        Ok(users) => AccountsPage { rows: account_rows(&users, &prefs.query), error: None },
        Err(e) => {
            warn!(error = %e, "account list unavailable");
            AccountsPage { rows: Vec::new(), error: Some(e.user_message("Failed to load accounts")) }
        }
    };
    let layout = Layout::new("Accounts", &prefs, Some(caller), flash_of(&req));
    render(&state, "accounts.html", &layout, &page)
}

pub async fn admin_account_detail(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
    path: web::Path<String>,
) -> Result<HttpResponse, PageError> {
    let caller = match require_admin(&viewer) {
        Ok(caller) => caller,
        Err(redirect) => return Ok(redirect),
    };
    let user = match state.api.admin_account(&viewer.session, &path).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return not_found_page(&state, &req, &viewer, &prefs),
        Err(e) => return Err(e.into()),
    };
    let detail = AccountDetail::build(&user, &state.gate(&viewer));
    let layout = Layout::new(user.username.clone(), &prefs, Some(caller), flash_of(&req));
    render(&state, "account_detail.html", &layout, &detail)
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminBack {
    back: Option<String>,
}

impl AdminBack {
    fn from_account_page(&self) -> bool {
        self.back.as_deref() == Some("account")
    }
}

/// Send one admin mutation and redirect to a page that loads fresh data.
async fn run_mutation(state: &AppState, session: Session, mutation: Mutation, back: &str) -> HttpResponse {
    if session.is_anonymous() {
        return see_other("/login");
    }
    let flash = match apply(&state.api, &session, &mutation).await {
        Outcome::Notice(message) => Flash::notice(message),
        Outcome::Error(message) => Flash::error(message),
    };
    see_other(flash.redirect_to(back))
}

pub async fn admin_toggle_block(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    back: web::Query<AdminBack>,
) -> HttpResponse {
    let id = path.into_inner();
    let location = if back.from_account_page() {
        format!("/admin/accounts/{}", urlencoding::encode(&id))
    } else {
        "/admin?tab=users".to_string()
    };
    run_mutation(&state, session, Mutation::ToggleBlock(id), &location).await
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    role: Role,
}

pub async fn admin_set_role(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    form: web::Form<RoleForm>,
) -> HttpResponse {
    run_mutation(&state, session, Mutation::SetRole(path.into_inner(), form.role), "/admin?tab=users").await
}

pub async fn admin_delete_user(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    back: web::Query<AdminBack>,
) -> HttpResponse {
    let location = if back.from_account_page() { "/admin/accounts" } else { "/admin?tab=users" };
    run_mutation(&state, session, Mutation::DeleteUser(path.into_inner()), location).await
}

pub async fn admin_delete_post(state: web::Data<AppState>, session: Session, path: web::Path<String>) -> HttpResponse {
    run_mutation(&state, session, Mutation::DeletePost(path.into_inner()), "/admin?tab=posts").await
}

pub async fn admin_delete_comment(state: web::Data<AppState>, session: Session, path: web::Path<String>) -> HttpResponse {
    run_mutation(&state, session, Mutation::DeleteComment(path.into_inner()), "/admin?tab=comments").await
}

pub async fn admin_update_account(state: web::Data<AppState>, viewer: Viewer, payload: Multipart) -> HttpResponse {
    save_profile(&state, viewer, payload, "/admin?tab=account").await
}

pub async fn admin_change_password(state: web::Data<AppState>, session: Session, form: web::Form<PasswordForm>) -> HttpResponse {
    save_password(&state, session, form.into_inner(), "/admin?tab=account").await
}

// ---------- static ----------

pub async fn asset(path: web::Path<String>) -> HttpResponse {
    let (body, content_type) = match path.as_str() {
        "quire.js" => (QUIRE_JS, "application/javascript; charset=utf-8"),
        "quire.css" => (QUIRE_CSS, "text/css; charset=utf-8"),
        _ => return HttpResponse::NotFound().finish(),
    };
    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(body)
}

pub async fn not_found(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    prefs: Preferences,
) -> Result<HttpResponse, PageError> {
    not_found_page(&state, &req, &viewer, &prefs)
}
