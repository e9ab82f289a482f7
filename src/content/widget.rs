//! Lifecycle of the rich-text widget that edits and displays documents.
//!
//! The widget itself runs in the browser. On the server it is represented by
//! a [`ContentWidget`] that produces the mount descriptor the page script
//! reads and that validates the document the browser posts back. A
//! [`WidgetSlot`] owns at most one widget per view and tears it down before a
//! new document is mounted.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::document::ContentDocument;

pub const DEFAULT_EDITOR_CDN: &str = "https://cdn.jsdelivr.net/npm";
pub const UPLOAD_ENDPOINT: &str = "/editor/upload-image";

#[derive(Debug, Error, PartialEq)]
pub enum WidgetError {
    #[error("widget is not ready")]
    NotReady,
    #[error("widget was destroyed")]
    Destroyed,
    #[error("widget failed to initialize: {0}")]
    Init(String),
    #[error("editor returned an invalid document: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetMode {
    ReadOnly,
    Authoring,
}

/// Where and how a widget is mounted. `document_key` identifies the document
/// the mount belongs to (a post id, or `new` for a fresh draft).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetMount {
    pub holder_id: String,
    pub document_key: String,
    pub mode: WidgetMode,
}

impl WidgetMount {
    pub fn new(document_key: impl Into<String>, mode: WidgetMode) -> Self {
        let document_key = document_key.into();
        let prefix = match mode {
            WidgetMode::ReadOnly => "reader",
            WidgetMode::Authoring => "editor",
        };
        Self { holder_id: format!("{prefix}-{document_key}"), document_key, mode }
    }
}

#[async_trait]
pub trait ContentWidget: Send {
    /// Resolves once the widget can accept a document.
    async fn ready(&mut self) -> Result<(), WidgetError>;
    async fn render(&mut self, doc: &ContentDocument) -> Result<(), WidgetError>;
    async fn save(&mut self) -> Result<ContentDocument, WidgetError>;
    /// Release the widget. Must be safe to call more than once.
    fn destroy(&mut self);
}

pub trait WidgetFactory {
    type Widget: ContentWidget;

    fn create(&self, mount: &WidgetMount) -> Result<Self::Widget, WidgetError>;
}

/// Holds the single live widget of a view.
pub struct WidgetSlot<F: WidgetFactory> {
    factory: F,
    current: Option<(WidgetMount, F::Widget)>,
}

impl<F: WidgetFactory> WidgetSlot<F> {
    pub fn new(factory: F) -> Self {
        Self { factory, current: None }
    }

    /// Widget for `mount`. An existing widget for the same document and mode
    /// is reused; any other is destroyed before the new one is constructed.
    pub fn acquire(&mut self, mount: WidgetMount) -> Result<&mut F::Widget, WidgetError> {
        let reuse = matches!(&self.current, Some((live, _)) if *live == mount);
        if !reuse {
            self.release();
            debug!(holder = %mount.holder_id, "constructing content widget");
            let widget = self.factory.create(&mount)?;
            self.current = Some((mount, widget));
        }
        match self.current.as_mut() {
            Some((_, widget)) => Ok(widget),
            None => Err(WidgetError::Destroyed),
        }
    }

    pub fn current(&mut self) -> Option<&mut F::Widget> {
        self.current.as_mut().map(|(_, w)| w)
    }

    pub fn mount(&self) -> Option<&WidgetMount> {
        self.current.as_ref().map(|(m, _)| m)
    }

    pub fn release(&mut self) {
        if let Some((mount, mut widget)) = self.current.take() {
            debug!(holder = %mount.holder_id, "destroying content widget");
            widget.destroy();
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: WidgetFactory> Drop for WidgetSlot<F> {
    fn drop(&mut self) {
        self.release();
    }
}

/// What the page script needs to mount Editor.js in the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountDescriptor {
    pub holder: String,
    pub read_only: bool,
    pub data: serde_json::Value,
    pub cdn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_endpoint: Option<String>,
}

impl MountDescriptor {
    /// JSON safe to place inside a `<script type="application/json">` tag.
    pub fn to_script_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| "{}".to_string())
            .replace("</", "<\\/")
    }
}

/// Server half of the Editor.js widget.
#[derive(Debug)]
pub struct EditorJsWidget {
    mount: WidgetMount,
    cdn: String,
    ready: bool,
    destroyed: bool,
    document: Option<ContentDocument>,
    submitted: Option<String>,
}

impl EditorJsWidget {
    /// Payload the browser posted from this widget's holder.
    pub fn receive(&mut self, payload: impl Into<String>) {
        self.submitted = Some(payload.into());
    }

    pub fn descriptor(&self) -> MountDescriptor {
        let data = self
            .document
            .as_ref()
            .map(ContentDocument::to_value)
            .unwrap_or_else(|| ContentDocument::default().to_value());
        MountDescriptor {
            holder: self.mount.holder_id.clone(),
            read_only: self.mount.mode == WidgetMode::ReadOnly,
            data,
            cdn: self.cdn.clone(),
            upload_endpoint: match self.mount.mode {
                WidgetMode::Authoring => Some(UPLOAD_ENDPOINT.to_string()),
                WidgetMode::ReadOnly => None,
            },
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn check_alive(&self) -> Result<(), WidgetError> {
        if self.destroyed {
            Err(WidgetError::Destroyed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentWidget for EditorJsWidget {
    async fn ready(&mut self) -> Result<(), WidgetError> {
        self.check_alive()?;
        self.ready = true;
        Ok(())
    }

    async fn render(&mut self, doc: &ContentDocument) -> Result<(), WidgetError> {
        self.check_alive()?;
        if !self.ready {
            return Err(WidgetError::NotReady);
        }
        self.document = Some(doc.clone());
        Ok(())
    }

    async fn save(&mut self) -> Result<ContentDocument, WidgetError> {
        self.check_alive()?;
        let Some(raw) = self.submitted.as_deref() else {
            return Ok(self.document.clone().unwrap_or_default());
        };
        let doc: ContentDocument = serde_json::from_str(raw).map_err(|e| {
            warn!(error = %e, holder = %self.mount.holder_id, "editor payload rejected");
            WidgetError::InvalidPayload(e.to_string())
        })?;
        self.document = Some(doc.clone());
        Ok(doc)
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.ready = false;
    }
}

#[derive(Debug, Clone)]
pub struct EditorJsFactory {
    cdn: String,
}

impl EditorJsFactory {
    pub fn new(cdn: impl Into<String>) -> Self {
        Self { cdn: cdn.into() }
    }
}

impl Default for EditorJsFactory {
    fn default() -> Self {
        Self::new(DEFAULT_EDITOR_CDN)
    }
}

impl WidgetFactory for EditorJsFactory {
    type Widget = EditorJsWidget;

    fn create(&self, mount: &WidgetMount) -> Result<EditorJsWidget, WidgetError> {
        if mount.document_key.is_empty() {
            return Err(WidgetError::Init("widget mount has no document key".into()));
        }
        Ok(EditorJsWidget {
            mount: mount.clone(),
            cdn: self.cdn.clone(),
            ready: false,
            destroyed: false,
            document: None,
            submitted: None,
        })
    }
}
