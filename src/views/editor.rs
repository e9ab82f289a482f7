//! Post authoring: the create/edit page and the widget's image uploader.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::BackendClient;
use crate::content::widget::{ContentWidget, EditorJsFactory, WidgetError, WidgetMode, WidgetMount, WidgetSlot};
use crate::content::{ContentDocument, PostBody};
use crate::error::ValidationError;
use crate::forms::MultipartForm;
use crate::models::{NewPost, Post, Upload};
use crate::session::Session;

pub const NEW_DOCUMENT_KEY: &str = "new";
pub const UPLOAD_FAILED: &str = "Image upload failed";

/// What the browser posted from the authoring page.
#[derive(Debug, Clone, Default)]
pub struct EditorSubmission {
    pub edit_id: Option<String>,
    pub title: String,
    pub category: String,
    pub content: String,
    pub featured_image: Option<Upload>,
    /// Featured image the post already had when the form was opened.
    pub current_image: Option<String>,
}

impl EditorSubmission {
    pub fn from_form(form: &mut MultipartForm) -> Self {
        let edit_id = Some(form.text("editId").trim().to_string()).filter(|s| !s.is_empty());
        Self {
            edit_id,
            title: form.text("title").trim().to_string(),
            category: form.text("category").trim().to_string(),
            content: form.text("content").to_string(),
            featured_image: form.take_file("featuredImage"),
            current_image: Some(form.text("currentImage").trim().to_string()).filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("The editor content could not be read. Please try again.")]
    Widget(#[from] WidgetError),
}

#[derive(Debug, Serialize)]
pub struct EditorView {
    pub editing_id: Option<String>,
    pub title: String,
    pub category: String,
    pub image_preview: Option<String>,
    /// Mount descriptor for the authoring widget.
    pub widget: String,
    pub submit_label: &'static str,
    pub error: Option<String>,
}

/// The authoring surface of one page. Owns the editor widget for the post
/// being edited.
pub struct PostEditor {
    slot: WidgetSlot<EditorJsFactory>,
}

impl PostEditor {
    pub fn new(factory: EditorJsFactory) -> Self {
        Self { slot: WidgetSlot::new(factory) }
    }

    /// Mount the editor and, once it is ready, load `existing` into it.
    pub async fn load(&mut self, existing: Option<&Post>) -> Result<EditorView, WidgetError> {
        let key = existing.map_or(NEW_DOCUMENT_KEY, |p| p.id.as_str());
        let document = existing.and_then(|p| p.content.document());
        let widget = self.prepare(key, document).await?;
        Ok(EditorView {
            editing_id: existing.map(|p| p.id.clone()),
            title: existing.map(|p| p.title.clone()).unwrap_or_default(),
            category: existing.map(|p| p.category.clone()).unwrap_or_default(),
            image_preview: existing.and_then(|p| p.featured_image.clone()),
            widget,
            submit_label: submit_label(existing.is_some()),
            error: None,
        })
    }

    /// Validate a submission into the payload for the backend.
    pub async fn save(&mut self, submission: &mut EditorSubmission) -> Result<NewPost, EditorError> {
        if submission.title.is_empty() {
            return Err(ValidationError::Required("Title").into());
        }
        if submission.category.is_empty() {
            return Err(ValidationError::Required("Category").into());
        }
        let key = submission.edit_id.as_deref().unwrap_or(NEW_DOCUMENT_KEY).to_string();
        let widget = self.slot.acquire(WidgetMount::new(key, WidgetMode::Authoring))?;
        widget.ready().await?;
        widget.receive(submission.content.clone());
        let content: ContentDocument = widget.save().await?;
        if content.is_empty() {
            return Err(ValidationError::Required("Content").into());
        }
        Ok(NewPost {
            title: submission.title.clone(),
            category: submission.category.clone(),
            content,
            featured_image: submission.featured_image.take(),
        })
    }

    /// Re-render the form after a failed save, keeping what the user typed.
    pub async fn reopen(&mut self, submission: &EditorSubmission, error: String) -> EditorView {
        let key = submission.edit_id.as_deref().unwrap_or(NEW_DOCUMENT_KEY).to_string();
        let submitted = PostBody::from_json_str(&submission.content);
        let widget = match self.prepare(&key, submitted.document()).await {
            Ok(widget) => widget,
            Err(e) => {
                warn!(error = %e, "editor could not be remounted");
                String::from("{}")
            }
        };
        EditorView {
            editing_id: submission.edit_id.clone(),
            title: submission.title.clone(),
            category: submission.category.clone(),
            image_preview: submission.current_image.clone(),
            widget,
            submit_label: submit_label(submission.edit_id.is_some()),
            error: Some(error),
        }
    }

    async fn prepare(&mut self, key: &str, document: Option<&ContentDocument>) -> Result<String, WidgetError> {
        let widget = self.slot.acquire(WidgetMount::new(key, WidgetMode::Authoring))?;
        widget.ready().await?;
        if let Some(doc) = document {
            widget.render(doc).await?;
        }
        Ok(widget.descriptor().to_script_json())
    }
}

fn submit_label(editing: bool) -> &'static str {
    if editing {
        "Update Post"
    } else {
        "Publish Post"
    }
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub url: String,
}

/// Reply in the shape the widget's image tool expects.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadReply {
    Uploaded { success: u8, file: UploadedFile },
    Failed { success: u8, message: String },
}

impl UploadReply {
    pub fn uploaded(url: String) -> Self {
        UploadReply::Uploaded { success: 1, file: UploadedFile { url } }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        UploadReply::Failed { success: 0, message: message.into() }
    }
}

pub async fn upload_for_widget(api: &BackendClient, session: &Session, upload: Upload) -> UploadReply {
    let file_name = upload.file_name.clone();
    match api.upload_image(session, upload).await {
        Ok(url) => {
            info!(%file_name, %url, "editor image uploaded");
            UploadReply::uploaded(url)
        }
        Err(e) => {
            warn!(%file_name, error = %e, "editor image upload failed");
            UploadReply::failed(UPLOAD_FAILED)
        }
    }
}
