//! Display helpers for listing views: excerpt, reading time, dates.

use chrono::{DateTime, NaiveDate, Utc};

use super::document::{ContentDocument, PostBody};

pub const WORDS_PER_MINUTE: f64 = 200.0;
pub const ELLIPSIS: &str = "...";
/// Excerpt length used on listing cards.
pub const CARD_EXCERPT_CHARS: usize = 120;

/// First paragraph of the document, cut to `max_chars` characters. When the
/// text is longer, the last slot is taken by the ellipsis marker.
pub fn excerpt(doc: &ContentDocument, max_chars: usize) -> String {
    match doc.first_paragraph() {
        Some(text) => truncate_chars(text, max_chars),
        None => String::new(),
    }
}

pub fn body_excerpt(body: &PostBody, max_chars: usize) -> String {
    body.document().map(|d| excerpt(d, max_chars)).unwrap_or_default()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}{ELLIPSIS}")
}

/// Whole minutes to read the document at 200 words per minute, never less
/// than one.
pub fn estimated_read_time(doc: &ContentDocument) -> u32 {
    let words: usize = doc.texts().map(|t| t.split_whitespace().count()).sum();
    minutes_for(words)
}

pub fn body_read_time(body: &PostBody) -> u32 {
    body.document().map(estimated_read_time).unwrap_or(1)
}

pub fn read_time_label(minutes: u32) -> String {
    format!("{minutes} min")
}

fn minutes_for(words: usize) -> u32 {
    ((words as f64 / WORDS_PER_MINUTE).round() as u32).max(1)
}

/// Calendar date for display, e.g. `Oct 17, 2026`. Input that is not an ISO
/// date is returned as-is.
pub fn format_date(iso: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return format_timestamp(&dt.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => iso.to_string(),
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBlock;

    fn paragraph_doc(text: &str) -> ContentDocument {
        ContentDocument::new(vec![ContentBlock::paragraph(text)])
    }

    #[test]
    fn excerpt_and_read_time_for_short_post() {
        let doc = paragraph_doc("Hello world, this is a test post about systems design.");
        assert_eq!(excerpt(&doc, 20), "Hello world, this i...");
        assert_eq!(estimated_read_time(&doc), 1);
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(excerpt(&paragraph_doc("tiny"), 20), "tiny");
        assert_eq!(excerpt(&paragraph_doc("exactly5"), 8), "exactly5");
    }

    #[test]
    fn excerpt_uses_first_paragraph_only() {
        let doc = ContentDocument::new(vec![
            ContentBlock::header("Heading first", 1),
            ContentBlock::paragraph("body"),
            ContentBlock::paragraph("second"),
        ]);
        assert_eq!(excerpt(&doc, 120), "body");
    }

    #[test]
    fn excerpt_is_empty_without_paragraphs() {
        assert_eq!(excerpt(&ContentDocument::default(), 20), "");
        let doc = ContentDocument::new(vec![ContentBlock::header("only a header", 2)]);
        assert_eq!(excerpt(&doc, 20), "");
        assert_eq!(body_excerpt(&PostBody::PlainText("raw".into()), 20), "");
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        assert_eq!(excerpt(&paragraph_doc("ééééé"), 3), "éé...");
    }

    #[test]
    fn read_time_rounds_and_floors_at_one() {
        let words = |n: usize| paragraph_doc(&vec!["w"; n].join(" "));
        assert_eq!(estimated_read_time(&ContentDocument::default()), 1);
        assert_eq!(estimated_read_time(&words(299)), 1);
        assert_eq!(estimated_read_time(&words(300)), 2);
        assert_eq!(estimated_read_time(&words(1000)), 5);
    }

    #[test]
    fn read_time_is_monotone_in_word_count() {
        let mut previous = 0;
        for n in (0..2000).step_by(37) {
            let minutes = estimated_read_time(&paragraph_doc(&vec!["w"; n].join(" ")));
            assert!(minutes >= previous && minutes >= 1);
            previous = minutes;
        }
    }

    #[test]
    fn read_time_ignores_blocks_without_text() {
        let doc = ContentDocument::new(vec![
            ContentBlock::image("/a.png", Some("caption words do not count".into())),
            ContentBlock::paragraph(vec!["w"; 400].join(" ")),
        ]);
        assert_eq!(estimated_read_time(&doc), 2);
        assert_eq!(read_time_label(2), "2 min");
    }

    #[test]
    fn dates_format_for_display() {
        assert_eq!(format_date("2026-10-17T08:30:00.000Z"), "Oct 17, 2026");
        assert_eq!(format_date("2024-02-03"), "Feb 3, 2024");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
