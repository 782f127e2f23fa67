//! MIME header handling and folded serialization.

use crate::encoding::{self, LineEnding};
use std::collections::HashMap;
use std::io::{self, Write};

/// Maximum length of an emitted header line.
const MAX_HEADER_LINE_LEN: usize = 76;

/// Collection of header fields.
///
/// Field names are case-insensitive and stored lower-case; values for one
/// name keep their insertion order. Serialization emits names in
/// lexicographic order so the output is deterministic.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Sets a header value, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, vec![value.into()]);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.remove(&name.to_lowercase());
    }

    /// Returns true if no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Serializes all fields as folded header lines.
    ///
    /// Names are emitted in lexicographic order with canonical
    /// capitalization. Values that are not 7bit clean are encoded as
    /// RFC 2047 encoded-words. Lines fold at 76 columns with a single space
    /// of continuation indent. With `omit_final_terminator`, the last line's
    /// terminator is left off for callers that immediately append a blank
    /// separator themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn write_folded<W: Write + ?Sized>(
        &self,
        w: &mut W,
        line_ending: LineEnding,
        omit_final_terminator: bool,
    ) -> io::Result<()> {
        let mut fields: Vec<(&String, &Vec<String>)> = self.headers.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let total: usize = fields.iter().map(|(_, values)| values.len()).sum();
        let mut index = 0;
        for (name, values) in fields {
            let display = canonical_name(name);
            for value in values {
                index += 1;
                let encoded = encoding::encode_header_value(value);
                let omit = omit_final_terminator && index == total;
                write_folded_line(w, &display, &encoded, line_ending, omit)?;
            }
        }
        Ok(())
    }
}

/// Canonical display form of a field name, e.g. `content-type` to
/// `Content-Type`.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Writes one `Name: value` line, folding at spaces so no emitted line
/// exceeds the column limit. A word that does not fit even on a fresh
/// continuation line is emitted overlong rather than broken apart, since a
/// mid-token fold would change the value on unfolding.
fn write_folded_line<W: Write + ?Sized>(
    w: &mut W,
    name: &str,
    value: &str,
    line_ending: LineEnding,
    omit_terminator: bool,
) -> io::Result<()> {
    let terminator = line_ending.as_str().as_bytes();
    write!(w, "{name}:")?;
    let mut column = name.len() + 1;
    for word in value.split(' ') {
        if column + 1 + word.len() > MAX_HEADER_LINE_LEN && column > 1 {
            w.write_all(terminator)?;
            w.write_all(b" ")?;
            column = 1;
        } else {
            w.write_all(b" ")?;
            column += 1;
        }
        w.write_all(word.as_bytes())?;
        column += word.len();
    }
    if !omit_terminator {
        w.write_all(terminator)?;
    }
    Ok(())
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

    fn folded(headers: &Headers, line_ending: LineEnding) -> String {
        let mut out = Vec::new();
        headers.write_folded(&mut out, line_ending, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_headers_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set_replaces_values() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.remove("subject");
        assert!(headers.get("Subject").is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_iter_counts_all_values() {
        let mut headers = Headers::new();
        headers.add("Received", "one");
        headers.add("Received", "two");
        headers.add("Subject", "hi");
        assert_eq!(headers.iter().count(), 3);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("content-id"), "Content-Id");
        assert_eq!(canonical_name("subject"), "Subject");
    }

    #[test]
    fn test_write_folded_sorts_names() {
        let mut headers = Headers::new();
        headers.add("Subject", "hi");
        headers.add("Content-Type", "text/plain");
        headers.add("Date", "today");
        assert_eq!(
            folded(&headers, LineEnding::CrLf),
            "Content-Type: text/plain\r\nDate: today\r\nSubject: hi\r\n"
        );
    }

    #[test]
    fn test_write_folded_keeps_value_order_per_name() {
        let mut headers = Headers::new();
        headers.add("Received", "first hop");
        headers.add("Received", "second hop");
        assert_eq!(
            folded(&headers, LineEnding::Lf),
            "Received: first hop\nReceived: second hop\n"
        );
    }

    #[test]
    fn test_write_folded_wraps_long_values() {
        let mut headers = Headers::new();
        let value = "word ".repeat(40);
        headers.add("Subject", value.trim_end());
        let out = folded(&headers, LineEnding::CrLf);
        for line in out.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76, "line too long: {line:?}");
        }
        // Unfolding restores the original value.
        let unfolded = out.replace("\r\n ", " ");
        assert_eq!(unfolded.trim_end(), format!("Subject: {}", value.trim_end()));
    }

    #[test]
    fn test_write_folded_encodes_non_ascii_values() {
        let mut headers = Headers::new();
        headers.add("Subject", "Héllo");
        let out = folded(&headers, LineEnding::CrLf);
        assert!(out.starts_with("Subject: =?utf-8?"), "got: {out}");
        assert!(!out.contains('é'));
    }

    #[test]
    fn test_write_folded_omit_final_terminator() {
        let mut headers = Headers::new();
        headers.add("A", "1");
        headers.add("B", "2");
        let mut out = Vec::new();
        headers.write_folded(&mut out, LineEnding::Lf, true).unwrap();
        assert_eq!(out, b"A: 1\nB: 2");
    }
}
