//! Server-side fallback renderer for post bodies.
//!
//! The browser widget is the primary renderer; this output sits inside the
//! widget's holder, so readers see it while the widget loads and whenever it
//! fails. Nothing here returns an error to the caller: a block that cannot be
//! drawn becomes a placeholder and its siblings still render.

use thiserror::Error;
use tracing::warn;

use super::document::{BlockKind, ContentBlock, ContentDocument, ListItem, ListStyle, PostBody};

pub const EMPTY_PLACEHOLDER: &str = "No content available";
pub const BLOCK_ERROR_PLACEHOLDER: &str = "Error rendering content block";

#[derive(Debug, Error, PartialEq)]
pub enum BlockRenderError {
    #[error("malformed {type_name} block: {reason}")]
    Malformed { type_name: String, reason: String },
    #[error("refusing image url {0:?}")]
    UnsafeUrl(String),
}

/// Render an ingested post body.
pub fn render_body(body: &PostBody) -> String {
    match body {
        PostBody::Empty => empty_placeholder(),
        PostBody::PlainText(text) => format!("<pre class=\"content-plain\">{}</pre>", html_escape(text)),
        PostBody::Document(doc) => render_document(doc),
    }
}

/// Render content stored as a JSON string. Text that is not JSON is shown
/// literally.
pub fn render_json_str(raw: &str) -> String {
    render_body(&PostBody::from_json_str(raw))
}

pub fn render_document(doc: &ContentDocument) -> String {
    if doc.is_empty() {
        return empty_placeholder();
    }
    let mut html = String::from("<div class=\"content-blocks\">");
    for (index, block) in doc.blocks.iter().enumerate() {
        match render_block(block) {
            Ok(fragment) => html.push_str(&fragment),
            Err(e) => {
                warn!(index, error = %e, "content block replaced by placeholder");
                html.push_str(&format!(
                    "<div class=\"content-block-error\">{BLOCK_ERROR_PLACEHOLDER}</div>"
                ));
            }
        }
    }
    html.push_str("</div>");
    html
}

/// Render one block.
pub fn render_block(block: &ContentBlock) -> Result<String, BlockRenderError> {
    match block.kind() {
        BlockKind::Paragraph { text } => Ok(format!("<p>{}</p>", sanitize_text(text))),
        BlockKind::Header { text, level } => {
            let level = (*level).clamp(1, 6);
            Ok(format!("<h{level}>{}</h{level}>", sanitize_text(text)))
        }
        BlockKind::List { style, items } => Ok(render_list(*style, items)),
        BlockKind::Image { url, caption } => render_image(url, caption.as_deref()),
        BlockKind::Unsupported { type_name } => Ok(format!(
            "<div class=\"content-unsupported\">Unsupported content type: {}</div>",
            html_escape(type_name)
        )),
        BlockKind::Malformed { type_name, reason } => Err(BlockRenderError::Malformed {
            type_name: type_name.clone(),
            reason: reason.clone(),
        }),
    }
}

fn empty_placeholder() -> String {
    format!("<p class=\"content-empty\">{EMPTY_PLACEHOLDER}</p>")
}

fn render_list(style: ListStyle, items: &[ListItem]) -> String {
    let tag = match style {
        ListStyle::Ordered => "ol",
        ListStyle::Unordered => "ul",
    };
    let mut html = format!("<{tag}>");
    for item in items {
        html.push_str("<li>");
        html.push_str(&sanitize_text(&item.content));
        if !item.items.is_empty() {
            html.push_str(&render_list(style, &item.items));
        }
        html.push_str("</li>");
    }
    html.push_str(&format!("</{tag}>"));
    html
}

// The reader script hides images flagged with data-hide-on-error when they
// fail to load.
fn render_image(url: &str, caption: Option<&str>) -> Result<String, BlockRenderError> {
    if !is_safe_url(url) {
        return Err(BlockRenderError::UnsafeUrl(url.to_string()));
    }
    let alt = caption.unwrap_or("Blog image");
    let mut html = format!(
        "<figure class=\"content-image\"><img src=\"{}\" alt=\"{}\" data-hide-on-error>",
        html_escape(url),
        html_escape(alt)
    );
    if let Some(caption) = caption {
        html.push_str(&format!("<figcaption>{}</figcaption>", html_escape(caption)));
    }
    html.push_str("</figure>");
    Ok(html)
}

/// Inline markup from the editor (`<b>`, `<i>`, links) is kept, anything
/// dangerous is stripped.
fn sanitize_text(input: &str) -> String {
    ammonia::clean(input)
}

fn is_safe_url(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.starts_with("https://")
        || trimmed.starts_with("http://")
        || (trimmed.starts_with('/') && !trimmed.starts_with("//"))
}

pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
