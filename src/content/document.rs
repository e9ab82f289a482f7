//! Block-structured post bodies as produced by the editor widget.
//!
//! Every block is validated once, when it enters the process (a fetched post
//! or a submitted editor payload). The typed [`BlockKind`] is what the rest of
//! the crate works with; the original `data` object is kept alongside so a
//! document survives a load/save cycle without losing widget-specific fields.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDocument {
    pub time: Option<i64>,
    pub version: Option<String>,
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: String,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph { text: String },
    Header { text: String, level: u8 },
    List { style: ListStyle, items: Vec<ListItem> },
    Image { url: String, caption: Option<String> },
    /// A block type this crate does not know how to draw.
    Unsupported { type_name: String },
    /// A known block type whose data has the wrong shape.
    Malformed { type_name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    id: Option<String>,
    kind: BlockKind,
    data: Value,
}

pub const DEFAULT_HEADER_LEVEL: u8 = 2;

impl ContentDocument {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { time: None, version: None, blocks }
    }

    /// Build a document from a JSON value. `None` when the value is not an
    /// object with a `blocks` array.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let blocks = obj.get("blocks")?.as_array()?;
        Some(Self {
            time: obj.get("time").and_then(Value::as_i64),
            version: obj.get("version").and_then(Value::as_str).map(str::to_string),
            blocks: blocks.iter().map(ContentBlock::from_value).collect(),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(time) = self.time {
            obj.insert("time".into(), json!(time));
        }
        obj.insert(
            "blocks".into(),
            Value::Array(self.blocks.iter().map(ContentBlock::to_value).collect()),
        );
        if let Some(version) = &self.version {
            obj.insert("version".into(), json!(version));
        }
        Value::Object(obj)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The `text` of each block that carries one, in reading order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(ContentBlock::text)
    }

    pub fn first_paragraph(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match &b.kind {
            BlockKind::Paragraph { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Serialize for ContentDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ContentDocument::from_value(&value)
            .ok_or_else(|| D::Error::custom("content document has no blocks array"))
    }
}

impl ContentBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: None,
            data: json!({ "text": text }),
            kind: BlockKind::Paragraph { text },
        }
    }

    pub fn header(text: impl Into<String>, level: u8) -> Self {
        let text = text.into();
        let level = level.clamp(1, 6);
        Self {
            id: None,
            data: json!({ "text": text, "level": level }),
            kind: BlockKind::Header { text, level },
        }
    }

    pub fn list(style: ListStyle, items: Vec<String>) -> Self {
        let style_name = match style {
            ListStyle::Ordered => "ordered",
            ListStyle::Unordered => "unordered",
        };
        let data = json!({ "style": style_name, "items": items });
        let items = items
            .into_iter()
            .map(|content| ListItem { content, items: Vec::new() })
            .collect();
        Self { id: None, data, kind: BlockKind::List { style, items } }
    }

    pub fn image(url: impl Into<String>, caption: Option<String>) -> Self {
        let url = url.into();
        let mut data = json!({ "file": { "url": url } });
        if let Some(c) = &caption {
            data["caption"] = json!(c);
        }
        Self { id: None, data, kind: BlockKind::Image { url, caption } }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Validate one raw `{id?, type, data}` object. Never fails: shapes that
    /// cannot be understood become `Unsupported` or `Malformed` blocks.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::malformed("", value.clone(), "block is not an object");
        };
        let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
        let data = obj.get("data").cloned().unwrap_or_else(|| Value::Object(Map::new()));
        let type_name = match obj.get("type").and_then(Value::as_str) {
            Some(t) => t,
            None => {
                return Self::malformed("", data, "block has no type").with_id_opt(id);
            }
        };

        let kind = match parse_kind(type_name, &data) {
            Ok(kind) => kind,
            Err(reason) => {
                debug!(block_type = type_name, %reason, "malformed content block");
                BlockKind::Malformed { type_name: type_name.to_string(), reason }
            }
        };
        Self { id, kind, data }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(id) = &self.id {
            obj.insert("id".into(), json!(id));
        }
        obj.insert("type".into(), json!(self.type_name()));
        obj.insert("data".into(), self.data.clone());
        Value::Object(obj)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Header { .. } => "header",
            BlockKind::List { .. } => "list",
            BlockKind::Image { .. } => "image",
            BlockKind::Unsupported { type_name } | BlockKind::Malformed { type_name, .. } => {
                type_name
            }
        }
    }

    /// The block's `text`, when it has one. Unknown block types contribute
    /// their `data.text` if it is a string.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Paragraph { text } | BlockKind::Header { text, .. } => Some(text),
            BlockKind::Unsupported { .. } => self.data.get("text").and_then(Value::as_str),
            _ => None,
        }
    }

    fn malformed(type_name: &str, data: Value, reason: &str) -> Self {
        Self {
            id: None,
            kind: BlockKind::Malformed { type_name: type_name.to_string(), reason: reason.to_string() },
            data,
        }
    }

    fn with_id_opt(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ContentBlock::from_value(&Value::deserialize(deserializer)?))
    }
}

fn parse_kind(type_name: &str, data: &Value) -> Result<BlockKind, String> {
    match type_name {
        "paragraph" => Ok(BlockKind::Paragraph { text: required_text(data, "paragraph")? }),
        "header" => {
            let text = required_text(data, "header")?;
            let level = match data.get("level").and_then(Value::as_i64) {
                Some(n) => n.clamp(1, 6) as u8,
                None => DEFAULT_HEADER_LEVEL,
            };
            Ok(BlockKind::Header { text, level })
        }
        "list" => {
            let style = match data.get("style").and_then(Value::as_str) {
                Some("ordered") => ListStyle::Ordered,
                _ => ListStyle::Unordered,
            };
            let items = data
                .get("items")
                .and_then(Value::as_array)
                .ok_or_else(|| "list items must be an array".to_string())?;
            Ok(BlockKind::List { style, items: items.iter().map(ListItem::from_value).collect() })
        }
        "image" => {
            let url = data
                .get("file")
                .and_then(|f| f.get("url"))
                .and_then(Value::as_str)
                .or_else(|| data.get("url").and_then(Value::as_str))
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| "image has no url".to_string())?;
            let caption = match data.get("caption") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.is_empty() => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };
            Ok(BlockKind::Image { url: url.to_string(), caption })
        }
        other => Ok(BlockKind::Unsupported { type_name: other.to_string() }),
    }
}

fn required_text(data: &Value, block: &str) -> Result<String, String> {
    match data.get("text") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("{block} text is not a string")),
        None => Err(format!("{block} has no text")),
    }
}

impl ListItem {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self { content: s.clone(), items: Vec::new() },
            Value::Object(obj) if obj.get("content").map_or(false, Value::is_string) => Self {
                content: obj["content"].as_str().unwrap_or_default().to_string(),
                items: obj
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|nested| nested.iter().map(ListItem::from_value).collect())
                    .unwrap_or_default(),
            },
            other => Self { content: other.to_string(), items: Vec::new() },
        }
    }
}

/// A post body after ingestion. Ingestion never fails: whatever the backend
/// stored ends up as one of these three shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PostBody {
    #[default]
    Empty,
    Document(ContentDocument),
    /// Stored content that is not JSON at all.
    PlainText(String),
}

impl PostBody {
    pub fn ingest(value: &Value) -> Self {
        match value {
            Value::Null => PostBody::Empty,
            Value::String(s) => Self::from_json_str(s),
            other => match ContentDocument::from_value(other) {
                Some(doc) => PostBody::Document(doc),
                None => {
                    debug!("post content has no blocks array");
                    PostBody::Empty
                }
            },
        }
    }

    /// Content stored as a JSON string (the editor payload is submitted that way).
    pub fn from_json_str(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return PostBody::Empty;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(_)) | Ok(Value::Null) => PostBody::Empty,
            Ok(parsed) => Self::ingest(&parsed),
            Err(e) => {
                debug!(error = %e, "post content is not JSON; keeping it as plain text");
                PostBody::PlainText(raw.to_string())
            }
        }
    }

    pub fn document(&self) -> Option<&ContentDocument> {
        match self {
            PostBody::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl Serialize for PostBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PostBody::Empty => serializer.serialize_none(),
            PostBody::Document(doc) => doc.serialize(serializer),
            PostBody::PlainText(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for PostBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PostBody::ingest(&Value::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingests_known_block_types() {
        let doc = ContentDocument::from_value(&json!({
            "time": 1700000000000i64,
            "blocks": [
                {"id": "a", "type": "paragraph", "data": {"text": "Hello"}},
                {"type": "header", "data": {"text": "Title", "level": 3}},
                {"type": "list", "data": {"style": "ordered", "items": ["one", "two"]}},
                {"type": "image", "data": {"file": {"url": "/img/x.png"}, "caption": "cap"}}
            ],
            "version": "2.28.0"
        }))
        .unwrap();
        assert_eq!(doc.blocks.len(), 4);
        assert_eq!(doc.blocks[0].id(), Some("a"));
        assert_eq!(doc.blocks[0].kind(), &BlockKind::Paragraph { text: "Hello".into() });
        assert_eq!(doc.blocks[1].kind(), &BlockKind::Header { text: "Title".into(), level: 3 });
        assert!(matches!(doc.blocks[2].kind(), BlockKind::List { style: ListStyle::Ordered, items } if items.len() == 2));
        assert_eq!(
            doc.blocks[3].kind(),
            &BlockKind::Image { url: "/img/x.png".into(), caption: Some("cap".into()) }
        );
    }

    #[test]
    fn header_level_defaults_and_clamps() {
        let level = |data: Value| match ContentBlock::from_value(&json!({"type": "header", "data": data})).kind() {
            BlockKind::Header { level, .. } => *level,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(level(json!({"text": "x"})), 2);
        assert_eq!(level(json!({"text": "x", "level": "big"})), 2);
        assert_eq!(level(json!({"text": "x", "level": 9})), 6);
        assert_eq!(level(json!({"text": "x", "level": 0})), 1);
    }

    #[test]
    fn image_url_falls_back_to_data_url() {
        let block = ContentBlock::from_value(&json!({"type": "image", "data": {"url": "http://x/y.jpg"}}));
        assert_eq!(block.kind(), &BlockKind::Image { url: "http://x/y.jpg".into(), caption: None });
    }

    #[test]
    fn bad_shapes_become_malformed_not_errors() {
        let cases = [
            json!({"type": "paragraph", "data": {"text": 42}}),
            json!({"type": "image", "data": {"caption": "no url"}}),
            json!({"type": "list", "data": {"items": "nope"}}),
            json!({"data": {"text": "no type"}}),
            json!("just a string"),
        ];
        for raw in cases {
            let block = ContentBlock::from_value(&raw);
            assert!(matches!(block.kind(), BlockKind::Malformed { .. }), "{raw}");
        }
    }

    #[test]
    fn unknown_types_are_kept_with_their_data() {
        let raw = json!({"id": "q1", "type": "quote", "data": {"text": "wise", "caption": "someone"}});
        let block = ContentBlock::from_value(&raw);
        assert_eq!(block.kind(), &BlockKind::Unsupported { type_name: "quote".into() });
        assert_eq!(block.text(), Some("wise"));
        assert_eq!(block.to_value(), raw);
    }

    #[test]
    fn nested_and_non_string_list_items() {
        let block = ContentBlock::from_value(&json!({
            "type": "list",
            "data": {"items": [
                {"content": "parent", "items": [{"content": "child", "items": []}]},
                7
            ]}
        }));
        let BlockKind::List { style, items } = block.kind() else { panic!("not a list") };
        assert_eq!(*style, ListStyle::Unordered);
        assert_eq!(items[0].content, "parent");
        assert_eq!(items[0].items[0].content, "child");
        assert_eq!(items[1].content, "7");
    }

    #[test]
    fn widget_fields_survive_a_round_trip() {
        let raw = json!({
            "time": 1,
            "blocks": [{"id": "i", "type": "image", "data": {"file": {"url": "/a.png"}, "withBorder": true, "stretched": false}}],
            "version": "2.28.0"
        });
        let doc: ContentDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn post_body_ingestion() {
        assert_eq!(PostBody::ingest(&Value::Null), PostBody::Empty);
        assert_eq!(PostBody::ingest(&json!({"foo": 1})), PostBody::Empty);
        assert_eq!(PostBody::from_json_str("{not json"), PostBody::PlainText("{not json".into()));
        assert_eq!(PostBody::from_json_str("   "), PostBody::Empty);
        let body = PostBody::ingest(&json!("{\"blocks\":[{\"type\":\"paragraph\",\"data\":{\"text\":\"hi\"}}]}"));
        assert_eq!(body.document().map(|d| d.blocks.len()), Some(1));
        let empty = PostBody::ingest(&json!({"blocks": []}));
        assert!(empty.document().unwrap().is_empty());
    }

    #[test]
    fn document_without_blocks_fails_strict_deserialize() {
        assert!(serde_json::from_value::<ContentDocument>(json!({"time": 1})).is_err());
    }
}
