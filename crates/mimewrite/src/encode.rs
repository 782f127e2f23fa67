//! Part tree serialization: header finalization and the recursive multipart
//! writer.

use crate::boundary::{BoundaryGenerator, RandomBoundaryGenerator};
use crate::content_type;
use crate::encoding::{self, LineEnding, READ_CHUNK_SIZE, TransferEncoding};
use crate::error::Result;
use crate::header::Headers;
use crate::part::Part;
use std::collections::BTreeMap;
use std::io::{BufWriter, Read, Write};

/// Fully resolved MIME headers for one part, derived without mutating it.
#[derive(Debug)]
struct ResolvedHeaders {
    /// Declared headers merged with the derived MIME fields.
    headers: Headers,
    /// Chosen content transfer encoding.
    encoding: TransferEncoding,
    /// Boundary framing the children; `Some` iff the part has children.
    boundary: Option<String>,
}

impl Part {
    /// Encodes this part and all its children to the sink in MIME format,
    /// with CRLF line endings and automatic transfer-encoding selection for
    /// text content.
    ///
    /// # Errors
    ///
    /// Returns an error on the first sink write or content source read
    /// failure; output already written must be discarded.
    pub fn encode<W: Write>(&mut self, sink: W) -> Result<()> {
        self.encode_custom(sink, None, LineEnding::CrLf)
    }

    /// Encodes with an explicit transfer encoding for text content and CRLF
    /// line endings.
    ///
    /// # Errors
    ///
    /// Returns an error on the first sink write or content source read
    /// failure.
    pub fn encode_with_encoding<W: Write>(
        &mut self,
        sink: W,
        text_encoding: TransferEncoding,
    ) -> Result<()> {
        self.encode_custom(sink, Some(text_encoding), LineEnding::CrLf)
    }

    /// Encodes with an explicit transfer encoding for text content (`None`
    /// selects automatically) and an explicit line-ending convention applied
    /// uniformly to the whole output.
    ///
    /// # Errors
    ///
    /// Returns an error on the first sink write or content source read
    /// failure.
    pub fn encode_custom<W: Write>(
        &mut self,
        sink: W,
        text_encoding: Option<TransferEncoding>,
        line_ending: LineEnding,
    ) -> Result<()> {
        // Each invocation gets its own generator, so independent encodes
        // never share random-source state.
        let mut boundaries = RandomBoundaryGenerator;
        self.encode_with_generator(sink, text_encoding, line_ending, &mut boundaries)
    }

    /// Encodes with an injected boundary generator in addition to the other
    /// knobs, for deterministic output or custom token policies.
    ///
    /// # Errors
    ///
    /// Returns an error on the first sink write or content source read
    /// failure.
    pub fn encode_with_generator<W: Write>(
        &mut self,
        sink: W,
        text_encoding: Option<TransferEncoding>,
        line_ending: LineEnding,
        boundaries: &mut dyn BoundaryGenerator,
    ) -> Result<()> {
        let mut writer = BufWriter::new(sink);
        self.encode_part(&mut writer, text_encoding, line_ending, boundaries)?;
        writer.flush()?;
        Ok(())
    }

    fn encode_part<W: Write>(
        &mut self,
        w: &mut W,
        text_encoding: Option<TransferEncoding>,
        line_ending: LineEnding,
        boundaries: &mut dyn BoundaryGenerator,
    ) -> Result<()> {
        // A streaming source is probed up front so an empty source degrades
        // to "no body" exactly like an empty buffer.
        let probe = match self.content_source.as_mut() {
            Some(source) => read_probe(source.as_mut())?,
            None => Vec::new(),
        };
        let body: &[u8] = if self.content_source.is_some() {
            &probe
        } else {
            &self.content
        };

        let resolved = resolve_headers(self, body, text_encoding, boundaries);
        tracing::trace!(
            encoding = %resolved.encoding,
            children = self.children.len(),
            "encoding part"
        );

        resolved.headers.write_folded(w, line_ending, false)?;

        let terminator = line_ending.as_str().as_bytes();
        if !body.is_empty() {
            // Exactly one blank line between headers and body.
            w.write_all(terminator)?;
            self.write_body(w, &probe, resolved.encoding, line_ending)?;
        }

        if let Some(boundary) = &resolved.boundary {
            // The marker's leading terminator closes the preceding content
            // line, so boundaries always start at column 0.
            for child in &mut self.children {
                w.write_all(terminator)?;
                w.write_all(b"--")?;
                w.write_all(boundary.as_bytes())?;
                w.write_all(terminator)?;
                child.encode_part(w, text_encoding, line_ending, boundaries)?;
            }
            w.write_all(terminator)?;
            w.write_all(b"--")?;
            w.write_all(boundary.as_bytes())?;
            w.write_all(b"--")?;
            w.write_all(terminator)?;
        }
        Ok(())
    }

    fn write_body<W: Write>(
        &mut self,
        w: &mut W,
        probe: &[u8],
        encoding: TransferEncoding,
        line_ending: LineEnding,
    ) -> Result<()> {
        if let Some(source) = self.content_source.as_mut() {
            let mut remainder = probe.chain(source.as_mut());
            if self.raw {
                std::io::copy(&mut remainder, w)?;
            } else {
                encoding::write_base64_stream(w, &mut remainder, line_ending)?;
            }
            return Ok(());
        }
        if self.raw {
            w.write_all(&self.content)?;
            return Ok(());
        }
        match encoding {
            TransferEncoding::Base64 => encoding::write_base64(w, &self.content, line_ending)?,
            TransferEncoding::QuotedPrintable => {
                encoding::write_quoted_printable(w, &self.content, line_ending)?;
            }
            TransferEncoding::SevenBit => w.write_all(&self.content)?,
        }
        Ok(())
    }
}

/// Derives the final MIME headers for a part from its declared fields.
///
/// Pure with respect to the part: the returned set merges the declared
/// headers with the derived Content-Type, Content-Transfer-Encoding,
/// Content-Disposition and Content-Id fields, leaving the part untouched.
/// `body` is the buffered content or the streaming probe; it decides body
/// presence and feeds encoding detection.
fn resolve_headers(
    part: &Part,
    body: &[u8],
    text_encoding: Option<TransferEncoding>,
    boundaries: &mut dyn BoundaryGenerator,
) -> ResolvedHeaders {
    let mut headers = part.headers.clone();

    // Re-detection is authoritative unless the content passes through
    // pre-encoded from upstream.
    if !part.raw {
        headers.remove("content-transfer-encoding");
    }

    let mut charset = part.charset.clone();
    let mut encoding = TransferEncoding::SevenBit;
    if !body.is_empty() {
        encoding = TransferEncoding::Base64;
        if part.is_text_content() && part.content_source.is_none() {
            encoding =
                text_encoding.unwrap_or_else(|| TransferEncoding::detect(body, false));
            if charset.is_none() {
                charset = Some("utf-8".to_string());
            }
        }
        // RFC 2045: 7bit is assumed when the header is absent.
        match encoding {
            TransferEncoding::Base64 | TransferEncoding::QuotedPrintable => {
                headers.set("content-transfer-encoding", encoding.to_string());
            }
            TransferEncoding::SevenBit => {}
        }
    }

    let boundary = if part.children.is_empty() {
        None
    } else {
        Some(part.boundary.clone().unwrap_or_else(|| {
            let token = boundaries.generate();
            tracing::debug!(boundary = %token, "generated multipart boundary");
            token
        }))
    };

    if let Some(id) = part.content_id.as_deref().filter(|id| !id.is_empty()) {
        headers.set("content-id", to_id_header(id));
    }

    // The filename's encoding need is independent of the content's.
    let file_name = part
        .file_name
        .as_deref()
        .map(encoding::encode_header_value)
        .unwrap_or_default();

    if let Some(declared) = &part.content_type {
        let mut content_type = declared.clone();
        set_parameter(
            &mut content_type.parameters,
            "charset",
            charset.as_deref().unwrap_or_default(),
        );
        set_parameter(&mut content_type.parameters, "name", &file_name);
        set_parameter(
            &mut content_type.parameters,
            "boundary",
            boundary
                .as_deref()
                .or(part.boundary.as_deref())
                .unwrap_or_default(),
        );
        headers.set("content-type", content_type.to_string());
    }

    if let Some(disposition) = part.disposition.as_deref().filter(|d| !d.is_empty()) {
        let mut parameters = BTreeMap::new();
        set_parameter(&mut parameters, "filename", &file_name);
        if let Some(date) = part.file_mod_date {
            set_parameter(&mut parameters, "modification-date", &date.to_rfc2822());
        }
        headers.set(
            "content-disposition",
            content_type::format_media_type(disposition, &parameters),
        );
    }

    ResolvedHeaders {
        headers,
        encoding,
        boundary,
    }
}

/// Inserts a parameter, skipping empty values so they are omitted rather
/// than encoded as empty strings.
fn set_parameter(parameters: &mut BTreeMap<String, String>, key: &str, value: &str) {
    if !value.is_empty() {
        parameters.insert(key.to_string(), value.to_string());
    }
}

/// Formats a Content-Id value with angle brackets, leaving already bracketed
/// values alone.
fn to_id_header(id: &str) -> String {
    if id.starts_with('<') && id.ends_with('>') {
        id.to_string()
    } else {
        format!("<{id}>")
    }
}

/// Reads up to one chunk from a source, tolerating short reads, to learn
/// whether the body is empty before headers are finalized.
fn read_probe(source: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
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
    use crate::boundary::SequentialBoundaryGenerator;
    use crate::content_type::ContentType;
    use std::io::Cursor;

    fn resolve(part: &Part) -> ResolvedHeaders {
        let mut boundaries = SequentialBoundaryGenerator::new("b-");
        resolve_headers(part, &part.content, None, &mut boundaries)
    }

    #[test]
    fn test_resolve_seven_bit_omits_encoding_header() {
        let part = Part::text("Hello, World!\r\n");
        let resolved = resolve(&part);
        assert_eq!(resolved.encoding, TransferEncoding::SevenBit);
        assert!(resolved.headers.get("content-transfer-encoding").is_none());
    }

    #[test]
    fn test_resolve_sets_base64_header_for_binary_text() {
        let part = Part::text("x").with_content(vec![0xFFu8; 32]);
        let resolved = resolve(&part);
        assert_eq!(resolved.encoding, TransferEncoding::Base64);
        assert_eq!(
            resolved.headers.get("content-transfer-encoding"),
            Some("base64")
        );
    }

    #[test]
    fn test_resolve_defaults_charset_for_text_with_body() {
        let part = Part::text("hi");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_resolve_keeps_declared_charset() {
        let part = Part::text("hi").with_charset("iso-8859-1");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-type"),
            Some("text/plain; charset=iso-8859-1")
        );
    }

    #[test]
    fn test_resolve_no_charset_without_body() {
        let part = Part::new(ContentType::text_plain());
        let resolved = resolve(&part);
        assert_eq!(resolved.headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_resolve_hint_overrides_detection() {
        let mut part = Part::text("plain ascii");
        let mut boundaries = SequentialBoundaryGenerator::new("b-");
        let resolved = resolve_headers(
            &part,
            &part.content,
            Some(TransferEncoding::QuotedPrintable),
            &mut boundaries,
        );
        assert_eq!(resolved.encoding, TransferEncoding::QuotedPrintable);
        assert_eq!(
            resolved.headers.get("content-transfer-encoding"),
            Some("quoted-printable")
        );
        // The hint only applies to text content.
        part.content_type = Some(ContentType::octet_stream());
        let resolved = resolve_headers(
            &part,
            &part.content,
            Some(TransferEncoding::QuotedPrintable),
            &mut boundaries,
        );
        assert_eq!(resolved.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn test_resolve_clears_stale_encoding_header() {
        let part = Part::text("hello").with_header("Content-Transfer-Encoding", "base64");
        let resolved = resolve(&part);
        assert!(resolved.headers.get("content-transfer-encoding").is_none());
    }

    #[test]
    fn test_resolve_keeps_declared_encoding_for_raw_parts() {
        let part = Part::new(ContentType::text_plain())
            .with_raw_content(b"SGVsbG8=".to_vec())
            .with_header("Content-Transfer-Encoding", "base64");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-transfer-encoding"),
            Some("base64")
        );
    }

    #[test]
    fn test_resolve_generates_boundary_only_with_children() {
        let leaf = Part::text("hi");
        assert!(resolve(&leaf).boundary.is_none());

        let parent = Part::new(ContentType::multipart_mixed()).with_child(Part::text("hi"));
        let resolved = resolve(&parent);
        assert_eq!(resolved.boundary.as_deref(), Some("b-1"));
        assert_eq!(
            resolved.headers.get("content-type"),
            Some("multipart/mixed; boundary=b-1")
        );
    }

    #[test]
    fn test_resolve_prefers_declared_boundary() {
        let parent = Part::new(ContentType::multipart_mixed())
            .with_boundary("xyz")
            .with_child(Part::text("hi"));
        let resolved = resolve(&parent);
        assert_eq!(resolved.boundary.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_resolve_leaf_boundary_parameterizes_content_type_only() {
        let part = Part::new(ContentType::multipart_mixed()).with_boundary("xyz");
        let resolved = resolve(&part);
        assert!(resolved.boundary.is_none());
        assert_eq!(
            resolved.headers.get("content-type"),
            Some("multipart/mixed; boundary=xyz")
        );
    }

    #[test]
    fn test_resolve_brackets_content_id() {
        let part = Part::text("hi").with_content_id("frame@example.com");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-id"),
            Some("<frame@example.com>")
        );

        let part = Part::text("hi").with_content_id("<already@example.com>");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-id"),
            Some("<already@example.com>")
        );
    }

    #[test]
    fn test_resolve_encodes_filename_parameters() {
        let part = Part::new(ContentType::octet_stream())
            .with_content(vec![0u8; 16])
            .with_disposition("attachment")
            .with_file_name("naïve.txt");
        let resolved = resolve(&part);
        let content_type = resolved.headers.get("content-type").unwrap();
        let disposition = resolved.headers.get("content-disposition").unwrap();
        assert!(content_type.contains("name=\"=?utf-8?"), "got: {content_type}");
        assert!(disposition.contains("filename=\"=?utf-8?"), "got: {disposition}");
        assert!(disposition.starts_with("attachment"));
    }

    #[test]
    fn test_resolve_plain_filename_unencoded() {
        let part = Part::new(ContentType::octet_stream())
            .with_content(vec![0u8; 16])
            .with_disposition("attachment")
            .with_file_name("report.pdf");
        let resolved = resolve(&part);
        assert_eq!(
            resolved.headers.get("content-disposition"),
            Some("attachment; filename=report.pdf")
        );
    }

    #[test]
    fn test_resolve_includes_modification_date() {
        let date = chrono::DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        let part = Part::new(ContentType::octet_stream())
            .with_content(vec![0u8; 16])
            .with_disposition("attachment")
            .with_file_mod_date(date);
        let resolved = resolve(&part);
        let disposition = resolved.headers.get("content-disposition").unwrap();
        assert!(
            disposition.contains("modification-date=\"Tue,"),
            "got: {disposition}"
        );
        assert!(disposition.contains("Jul 2003"));
    }

    #[test]
    fn test_resolve_does_not_mutate_part() {
        let part = Part::new(ContentType::multipart_mixed())
            .with_header("Content-Transfer-Encoding", "base64")
            .with_child(Part::text("hi"));
        let _ = resolve(&part);
        assert!(part.boundary.is_none());
        assert!(part.charset.is_none());
        assert_eq!(
            part.headers.get("content-transfer-encoding"),
            Some("base64")
        );
    }

    #[test]
    fn test_resolve_stream_backed_text_defaults_to_base64() {
        let part = Part::new(ContentType::text_plain())
            .with_content_source(Cursor::new(b"streamed text".to_vec()));
        let mut boundaries = SequentialBoundaryGenerator::new("b-");
        let resolved = resolve_headers(&part, b"streamed text", None, &mut boundaries);
        assert_eq!(resolved.encoding, TransferEncoding::Base64);
    }

    #[test]
    fn test_read_probe_tolerates_short_reads() {
        struct Two<'a>(&'a [u8]);
        impl Read for Two<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.0.len().min(buf.len()).min(2);
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }
        let data = b"abcdefghij";
        let probe = read_probe(&mut Two(data)).unwrap();
        assert_eq!(probe, data);
    }
}
