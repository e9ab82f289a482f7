//! Post content: the block document, its fallback renderer, listing helpers
//! and the editor widget lifecycle.

pub mod document;
pub mod render;
pub mod summary;
pub mod widget;

pub use document::{BlockKind, ContentBlock, ContentDocument, ListItem, ListStyle, PostBody};
pub use render::{render_body, render_document, render_json_str};
pub use summary::{estimated_read_time, excerpt, format_date};
pub use widget::{ContentWidget, EditorJsFactory, EditorJsWidget, WidgetError, WidgetMode, WidgetMount, WidgetSlot};
