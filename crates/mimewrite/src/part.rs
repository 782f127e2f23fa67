//! MIME part tree.

use crate::content_type::ContentType;
use crate::header::Headers;
use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::io::Read;

/// One node of a MIME message tree.
///
/// A part owns its child parts in order; the whole tree is serialized with
/// [`Part::encode`] and friends. The MIME headers (Content-Type,
/// Content-Transfer-Encoding, Content-Disposition, Content-Id) are derived
/// from the declared fields at encode time; the declared fields themselves
/// are never mutated by encoding.
pub struct Part {
    /// Caller-declared headers, emitted alongside the derived MIME headers.
    pub headers: Headers,
    /// Fully buffered body bytes.
    pub content: Vec<u8>,
    /// Streaming body source; authoritative over `content` when present.
    /// Streamed bodies are Base64 encoded in bounded-memory chunks unless
    /// the part is raw.
    pub content_source: Option<Box<dyn Read>>,
    /// Base media type; the Content-Type header is omitted when `None`.
    pub content_type: Option<ContentType>,
    /// Declared character set; text parts default to utf-8 at encode time.
    pub charset: Option<String>,
    /// Content-Disposition base value, e.g. "inline" or "attachment".
    pub disposition: Option<String>,
    /// Attachment file name, emitted in the Content-Type `name` and
    /// Content-Disposition `filename` parameters, RFC 2047 encoded when
    /// needed.
    pub file_name: Option<String>,
    /// Attachment modification date for the Content-Disposition header.
    pub file_mod_date: Option<DateTime<FixedOffset>>,
    /// Content-Id, emitted angle-bracketed.
    pub content_id: Option<String>,
    /// Multipart boundary; generated at encode time when children are
    /// present and none was declared.
    pub boundary: Option<String>,
    /// Child parts, serialized between boundary markers in order.
    pub children: Vec<Part>,
    /// Emit the content bytes unmodified, bypassing encoding selection. Set
    /// when the content was already transfer-encoded upstream.
    pub raw: bool,
}

impl Part {
    /// Creates an empty part with the given content type.
    #[must_use]
    pub fn new(content_type: ContentType) -> Self {
        Self {
            headers: Headers::new(),
            content: Vec::new(),
            content_source: None,
            content_type: Some(content_type),
            charset: None,
            disposition: None,
            file_name: None,
            file_mod_date: None,
            content_id: None,
            boundary: None,
            children: Vec::new(),
            raw: false,
        }
    }

    /// Creates a text/plain part with the given body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(ContentType::text_plain()).with_content(body.into().into_bytes())
    }

    /// Sets the buffered body and moves the part.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets a streaming body source and moves the part.
    ///
    /// The source takes priority over `content`. At encode time a bounded
    /// probe is read from it to detect emptiness; the remainder is streamed
    /// in fixed-size chunks so memory stays bounded regardless of content
    /// length.
    #[must_use]
    pub fn with_content_source(mut self, source: impl Read + 'static) -> Self {
        self.content_source = Some(Box::new(source));
        self
    }

    /// Sets the declared charset and moves the part.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the Content-Disposition base value and moves the part.
    #[must_use]
    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    /// Sets the attachment file name and moves the part.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the attachment modification date and moves the part.
    #[must_use]
    pub fn with_file_mod_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.file_mod_date = Some(date);
        self
    }

    /// Sets the Content-Id and moves the part.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Sets an explicit multipart boundary and moves the part.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Adds a declared header value and moves the part.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Appends a child part and moves the part.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Marks the content as pre-encoded and moves the part.
    #[must_use]
    pub fn with_raw_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self.raw = true;
        self
    }

    /// True when the declared content type is textual, which enables
    /// transfer-encoding detection and the utf-8 charset default.
    #[must_use]
    pub fn is_text_content(&self) -> bool {
        self.content_type.as_ref().is_some_and(ContentType::is_text)
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("headers", &self.headers)
            .field("content_len", &self.content.len())
            .field("content_source", &self.content_source.is_some())
            .field("content_type", &self.content_type)
            .field("charset", &self.charset)
            .field("disposition", &self.disposition)
            .field("file_name", &self.file_name)
            .field("file_mod_date", &self.file_mod_date)
            .field("content_id", &self.content_id)
            .field("boundary", &self.boundary)
            .field("children", &self.children)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_text_part() {
        let part = Part::text("Hello");
        assert_eq!(part.content, b"Hello");
        assert!(part.is_text_content());
        assert!(part.children.is_empty());
    }

    #[test]
    fn test_octet_stream_is_not_text() {
        let part = Part::new(ContentType::octet_stream());
        assert!(!part.is_text_content());
    }

    #[test]
    fn test_builder_chain() {
        let part = Part::new(ContentType::octet_stream())
            .with_content(vec![1, 2, 3])
            .with_disposition("attachment")
            .with_file_name("data.bin")
            .with_content_id("data@example.com")
            .with_header("X-Custom", "yes");
        assert_eq!(part.content, [1, 2, 3]);
        assert_eq!(part.disposition.as_deref(), Some("attachment"));
        assert_eq!(part.file_name.as_deref(), Some("data.bin"));
        assert_eq!(part.content_id.as_deref(), Some("data@example.com"));
        assert_eq!(part.headers.get("x-custom"), Some("yes"));
    }

    #[test]
    fn test_content_source_is_authoritative() {
        let part = Part::new(ContentType::octet_stream())
            .with_content(b"stale".to_vec())
            .with_content_source(Cursor::new(b"fresh".to_vec()));
        assert!(part.content_source.is_some());
    }

    #[test]
    fn test_with_child_preserves_order() {
        let parent = Part::new(ContentType::multipart_mixed())
            .with_child(Part::text("one"))
            .with_child(Part::text("two"));
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[0].content, b"one");
        assert_eq!(parent.children[1].content, b"two");
    }

    #[test]
    fn test_debug_does_not_expose_source_contents() {
        let part = Part::text("hi").with_content_source(Cursor::new(Vec::new()));
        let rendered = format!("{part:?}");
        assert!(rendered.contains("content_source: true"));
    }
}
