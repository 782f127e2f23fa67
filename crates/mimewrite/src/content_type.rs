//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// MIME content type with parameters.
///
/// Parameters are kept in sorted order so formatting is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    /// Main type (e.g. "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g. "plain", "html", "mixed").
    pub sub_type: String,
    /// Parameters (e.g. charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type.
    ///
    /// The charset parameter is derived at encode time from the part's
    /// declared charset (utf-8 by default for text parts).
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type.
    ///
    /// The boundary parameter is derived at encode time from the part's
    /// declared or generated boundary.
    #[must_use]
    pub fn multipart_mixed() -> Self {
        Self::new("multipart", "mixed")
    }

    /// Creates a multipart/alternative content type.
    #[must_use]
    pub fn multipart_alternative() -> Self {
        Self::new("multipart", "alternative")
    }

    /// Creates a multipart/related content type.
    #[must_use]
    pub fn multipart_related() -> Self {
        Self::new("multipart", "related")
    }

    /// Adds a parameter and moves the content type.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts
            .next()
            .ok_or_else(|| Error::InvalidEncoding("empty content type".to_string()))?
            .trim();

        let (main_type, sub_type) = type_str.split_once('/').ok_or_else(|| {
            Error::InvalidEncoding(format!("missing subtype in content type: {type_str}"))
        })?;
        if main_type.trim().is_empty() || sub_type.trim().is_empty() {
            return Err(Error::InvalidEncoding(format!(
                "malformed content type: {type_str}"
            )));
        }

        let mut content_type = Self::new(
            main_type.trim().to_lowercase(),
            sub_type.trim().to_lowercase(),
        );

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                content_type.parameters.insert(key, value);
            }
        }

        Ok(content_type)
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = format!("{}/{}", self.main_type, self.sub_type);
        f.write_str(&format_media_type(&base, &self.parameters))
    }
}

/// Formats a media type expression (`base; key=value; ...`) with
/// deterministic parameter order, quoting values that contain whitespace or
/// tspecials. Shared by Content-Type and Content-Disposition formatting.
pub(crate) fn format_media_type(base: &str, parameters: &BTreeMap<String, String>) -> String {
    use std::fmt::Write as _;

    let mut out = base.to_string();
    for (key, value) in parameters {
        if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
            let _ = write!(out, "; {key}=\"{value}\"");
        } else {
            let _ = write!(out, "; {key}={value}");
        }
    }
    out
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

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_text_plain_is_text() {
        let ct = ContentType::text_plain();
        assert!(ct.is_text());
        assert!(!ct.is_multipart());
    }

    #[test]
    fn test_multipart_mixed_is_multipart() {
        let ct = ContentType::multipart_mixed();
        assert_eq!(ct.main_type, "multipart");
        assert_eq!(ct.sub_type, "mixed");
        assert!(ct.is_multipart());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_rejects_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("text/").is_err());
    }

    #[test]
    fn test_content_type_from_str() {
        let ct: ContentType = "image/png".parse().unwrap();
        assert_eq!(ct.main_type, "image");
        assert_eq!(ct.sub_type, "png");
    }

    #[test]
    fn test_content_type_display_sorted_params() {
        let ct = ContentType::text_plain()
            .with_parameter("format", "flowed")
            .with_parameter("charset", "utf-8");
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8; format=flowed");
    }

    #[test]
    fn test_content_type_display_quotes_special_values() {
        let ct = ContentType::multipart_mixed().with_parameter("boundary", "a b/c");
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"a b/c\"");
    }

    #[test]
    fn test_format_media_type_disposition() {
        let mut params = BTreeMap::new();
        params.insert("filename".to_string(), "report.pdf".to_string());
        assert_eq!(
            format_media_type("attachment", &params),
            "attachment; filename=report.pdf"
        );
    }
}
