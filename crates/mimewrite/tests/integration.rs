//! End-to-end encoding tests over full part trees.
//!
//! These tests drive the public entry points and check the emitted byte
//! stream against the wire format: header ordering and folding, blank-line
//! separation, transfer-encoded bodies, and multipart boundary framing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{self, Read, Write};

use mimewrite::encoding::{decode_base64, decode_quoted_printable};
use mimewrite::{
    ContentType, Error, LineEnding, Part, SequentialBoundaryGenerator, TransferEncoding,
};

/// Reader that hands out at most `chunk` bytes per call, to exercise short
/// reads on the streaming path.
struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.data.len() - self.pos).min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Sink that fails on the first write.
struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("sink failed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Source that fails after a few bytes.
struct FailingReader {
    remaining: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("source failed"));
        }
        let n = self.remaining.min(buf.len());
        buf[..n].fill(b'x');
        self.remaining -= n;
        Ok(n)
    }
}

/// Routes encoder tracing to stderr when `RUST_LOG` asks for it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn encode_crlf(part: &mut Part) -> Vec<u8> {
    let mut out = Vec::new();
    part.encode(&mut out).unwrap();
    out
}

/// Splits an encoded part into (header block, body).
fn split_message(output: &[u8], line_ending: LineEnding) -> (String, Vec<u8>) {
    let separator = match line_ending {
        LineEnding::CrLf => b"\r\n\r\n".as_slice(),
        LineEnding::Lf => b"\n\n".as_slice(),
    };
    let at = output
        .windows(separator.len())
        .position(|window| window == separator)
        .expect("no blank line separator");
    let headers = String::from_utf8(output[..at + line_ending.as_str().len()].to_vec()).unwrap();
    let body = output[at + separator.len()..].to_vec();
    (headers, body)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}

#[test]
fn test_seven_bit_ascii_passthrough() {
    let mut part = Part::text("Hello, World!\r\n");
    let out = encode_crlf(&mut part);
    assert_eq!(
        out,
        b"Content-Type: text/plain; charset=utf-8\r\n\r\nHello, World!\r\n"
    );
}

#[test]
fn test_binary_content_roundtrips_through_base64() {
    // 30% of the bytes are in 0x80..=0xFF, well past the Base64 cutoff.
    let content: Vec<u8> = (0..100u32)
        .map(|i| if i % 10 < 3 { 0x80 + (i % 64) as u8 } else { b'a' })
        .collect();
    let mut part = Part::new(ContentType::text_plain()).with_content(content.clone());
    let out = encode_crlf(&mut part);

    let (headers, body) = split_message(&out, LineEnding::CrLf);
    assert!(headers.contains("Content-Transfer-Encoding: base64"));

    let joined: String = String::from_utf8(body).unwrap().split("\r\n").collect();
    assert_eq!(decode_base64(&joined).unwrap(), content);
}

#[test]
fn test_long_ascii_line_uses_quoted_printable() {
    let content = vec![b'a'; 100];
    let mut part = Part::new(ContentType::text_plain()).with_content(content.clone());
    let out = encode_crlf(&mut part);

    let (headers, body) = split_message(&out, LineEnding::CrLf);
    assert!(headers.contains("Content-Transfer-Encoding: quoted-printable"));
    assert_eq!(decode_quoted_printable(&body).unwrap(), content);
}

#[test]
fn test_multipart_lf_boundary_markers() {
    let mut message = Part::new(ContentType::multipart_mixed())
        .with_boundary("xyz")
        .with_child(Part::text("First part"))
        .with_child(Part::text("Second part"));

    let mut out = Vec::new();
    message.encode_custom(&mut out, None, LineEnding::Lf).unwrap();

    assert_eq!(
        out,
        concat!(
            "Content-Type: multipart/mixed; boundary=xyz\n",
            "\n--xyz\n",
            "Content-Type: text/plain; charset=utf-8\n",
            "\nFirst part",
            "\n--xyz\n",
            "Content-Type: text/plain; charset=utf-8\n",
            "\nSecond part",
            "\n--xyz--\n",
        )
        .as_bytes()
    );
    assert_eq!(count_occurrences(&out, b"\n--xyz\n"), 2);
    assert_eq!(count_occurrences(&out, b"\n--xyz--\n"), 1);
}

#[test]
fn test_multipart_marker_count_matches_children() {
    let mut message = Part::new(ContentType::multipart_mixed()).with_boundary("edge");
    for i in 0..5 {
        message = message.with_child(Part::text(format!("part {i}")));
    }
    let out = encode_crlf(&mut message);
    assert_eq!(count_occurrences(&out, b"\r\n--edge\r\n"), 5);
    assert_eq!(count_occurrences(&out, b"\r\n--edge--\r\n"), 1);
}

#[test]
fn test_nested_multipart_boundaries_do_not_overlap() {
    let inner = Part::new(ContentType::multipart_related())
        .with_boundary("inner")
        .with_child(Part::text("html body"))
        .with_child(Part::new(ContentType::octet_stream()).with_content(vec![0xAB; 8]));
    let mut message = Part::new(ContentType::multipart_mixed())
        .with_boundary("outer")
        .with_child(inner)
        .with_child(Part::text("attachment text"));

    let out = encode_crlf(&mut message);
    let text = String::from_utf8(out).unwrap();

    let outer_open = text.find("\r\n--outer\r\n").unwrap();
    let inner_open = text.find("\r\n--inner\r\n").unwrap();
    let inner_close = text.find("\r\n--inner--\r\n").unwrap();
    let outer_close = text.find("\r\n--outer--\r\n").unwrap();
    assert!(outer_open < inner_open);
    assert!(inner_open < inner_close);
    assert!(inner_close < outer_close);

    assert_eq!(text.matches("\r\n--outer\r\n").count(), 2);
    assert_eq!(text.matches("\r\n--inner\r\n").count(), 2);
    assert_eq!(text.matches("\r\n--inner--\r\n").count(), 1);
    assert_eq!(text.matches("\r\n--outer--\r\n").count(), 1);
}

#[test]
fn test_multipart_with_own_content_and_children() {
    let mut message = Part::new(ContentType::multipart_mixed())
        .with_boundary("b")
        .with_content(b"preamble text".to_vec())
        .with_child(Part::text("child"));
    let out = encode_crlf(&mut message);
    let text = String::from_utf8(out).unwrap();
    // The parent body (Base64, since multipart is not text) sits between the
    // blank line and the first child marker.
    assert!(
        text.contains("\r\n\r\ncHJlYW1ibGUgdGV4dA==\r\n\r\n--b\r\n"),
        "got: {text}"
    );
}

#[test]
fn test_streaming_encode_equals_buffered_encode() {
    init_tracing();
    let content: Vec<u8> = (0..1_000_000u32).map(|i| ((i * 31 + 7) % 251) as u8).collect();

    let mut buffered = Part::new(ContentType::octet_stream()).with_content(content.clone());
    let buffered_out = encode_crlf(&mut buffered);

    // An awkward chunk size forces plenty of short reads.
    let mut streamed = Part::new(ContentType::octet_stream())
        .with_content_source(ChunkedReader::new(content, 1021));
    let streamed_out = encode_crlf(&mut streamed);

    assert_eq!(streamed_out, buffered_out);
}

#[test]
fn test_streaming_small_content_equals_buffered() {
    let content = b"fits in a single probe".to_vec();
    let mut buffered = Part::new(ContentType::octet_stream()).with_content(content.clone());
    let mut streamed =
        Part::new(ContentType::octet_stream()).with_content_source(ChunkedReader::new(content, 4));
    assert_eq!(encode_crlf(&mut streamed), encode_crlf(&mut buffered));
}

#[test]
fn test_streaming_empty_source_means_no_body() {
    let mut part = Part::new(ContentType::octet_stream())
        .with_content_source(ChunkedReader::new(Vec::new(), 16));
    let out = encode_crlf(&mut part);
    assert_eq!(out, b"Content-Type: application/octet-stream\r\n");
}

#[test]
fn test_content_source_takes_priority_over_content() {
    let mut part = Part::new(ContentType::octet_stream())
        .with_content(b"stale buffer".to_vec())
        .with_content_source(ChunkedReader::new(b"fresh bytes".to_vec(), 3));
    let out = encode_crlf(&mut part);
    let (_, body) = split_message(&out, LineEnding::CrLf);
    let joined: String = String::from_utf8(body).unwrap().split("\r\n").collect();
    assert_eq!(decode_base64(&joined).unwrap(), b"fresh bytes");
}

#[test]
fn test_encoding_is_deterministic_and_pure() {
    let build = || {
        Part::new(ContentType::multipart_alternative())
            .with_child(Part::text("plain"))
            .with_child(
                Part::new(ContentType::text_html()).with_content(b"<p>html</p>".to_vec()),
            )
    };

    let mut first = build();
    let mut first_out = Vec::new();
    let mut generator = SequentialBoundaryGenerator::new("gen-");
    first
        .encode_with_generator(&mut first_out, None, LineEnding::CrLf, &mut generator)
        .unwrap();

    let mut second = build();
    let mut second_out = Vec::new();
    let mut generator = SequentialBoundaryGenerator::new("gen-");
    second
        .encode_with_generator(&mut second_out, None, LineEnding::CrLf, &mut generator)
        .unwrap();

    assert_eq!(first_out, second_out);

    // Encoding derives headers without writing them back to the part.
    assert!(first.boundary.is_none());
    assert!(first.children[0].charset.is_none());
    assert!(first.headers.get("content-type").is_none());

    // The same part encodes identically a second time.
    let mut third_out = Vec::new();
    let mut generator = SequentialBoundaryGenerator::new("gen-");
    first
        .encode_with_generator(&mut third_out, None, LineEnding::CrLf, &mut generator)
        .unwrap();
    assert_eq!(third_out, first_out);
}

#[test]
fn test_generated_boundary_is_prefixed_and_consistent() {
    let mut message =
        Part::new(ContentType::multipart_mixed()).with_child(Part::text("only child"));
    let out = encode_crlf(&mut message);
    let text = String::from_utf8(out).unwrap();

    let param_at = text.find("boundary=mimewrite-").unwrap();
    let token: String = text[param_at + "boundary=".len()..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    assert_eq!(text.matches(&format!("\r\n--{token}\r\n")).count(), 1);
    assert_eq!(text.matches(&format!("\r\n--{token}--\r\n")).count(), 1);
}

#[test]
fn test_header_values_fold_within_76_columns() {
    let mut part = Part::text("body")
        .with_header(
            "Subject",
            "Un été très long avec beaucoup de caractères accentués pour forcer un encodage sur plusieurs mots",
        );
    let out = encode_crlf(&mut part);
    let (headers, _) = split_message(&out, LineEnding::CrLf);
    assert!(headers.contains("=?utf-8?"), "got: {headers}");
    for line in headers.split("\r\n").filter(|l| !l.is_empty()) {
        assert!(line.len() <= 76, "line too long ({}): {line:?}", line.len());
    }
}

#[test]
fn test_headers_emitted_in_sorted_order() {
    let mut part = Part::text("body")
        .with_header("Subject", "hi")
        .with_header("Date", "Mon, 4 Aug 2025 09:00:00 +0000")
        .with_header("From", "a@example.com");
    let out = encode_crlf(&mut part);
    let (headers, _) = split_message(&out, LineEnding::CrLf);
    let date_at = headers.find("Date:").unwrap();
    let content_type_at = headers.find("Content-Type:").unwrap();
    let from_at = headers.find("From:").unwrap();
    let subject_at = headers.find("Subject:").unwrap();
    assert!(content_type_at < date_at);
    assert!(date_at < from_at);
    assert!(from_at < subject_at);
}

#[test]
fn test_repeated_header_values_keep_insertion_order() {
    let mut part = Part::text("body")
        .with_header("Received", "from relay-one")
        .with_header("Received", "from relay-two");
    let out = encode_crlf(&mut part);
    let text = String::from_utf8(out).unwrap();
    let first = text.find("from relay-one").unwrap();
    let second = text.find("from relay-two").unwrap();
    assert!(first < second);
}

#[test]
fn test_attachment_headers() {
    let date = chrono::DateTime::parse_from_rfc2822("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
    let mut part = Part::new(ContentType::octet_stream())
        .with_content(vec![0x01, 0x02, 0x03, 0x04])
        .with_disposition("attachment")
        .with_file_name("report.pdf")
        .with_file_mod_date(date)
        .with_content_id("doc1@example.com");
    let out = encode_crlf(&mut part);
    let (headers, _) = split_message(&out, LineEnding::CrLf);

    assert!(headers.contains("Content-Id: <doc1@example.com>"));
    assert!(headers.contains("Content-Type: application/octet-stream; name=report.pdf"));
    assert!(headers.contains("Content-Transfer-Encoding: base64"));
    assert!(headers.contains("Content-Disposition: attachment; filename=report.pdf;"));
    assert!(headers.contains("modification-date=\""));
    assert!(headers.contains("Jul 2003"));
}

#[test]
fn test_raw_content_passes_through_unmodified() {
    let pre_encoded = b"SGVsbG8sIFdvcmxkIQ==\r\n".to_vec();
    let mut part = Part::new(ContentType::text_plain())
        .with_raw_content(pre_encoded.clone())
        .with_header("Content-Transfer-Encoding", "base64");
    let out = encode_crlf(&mut part);
    let (headers, body) = split_message(&out, LineEnding::CrLf);
    assert!(headers.contains("Content-Transfer-Encoding: base64"));
    assert_eq!(body, pre_encoded);
}

#[test]
fn test_empty_leaf_part_has_no_blank_line() {
    let mut part = Part::new(ContentType::text_plain());
    let out = encode_crlf(&mut part);
    assert_eq!(out, b"Content-Type: text/plain\r\n");
}

#[test]
fn test_explicit_text_encoding_hint() {
    let mut part = Part::text("short ascii body");
    let mut out = Vec::new();
    part.encode_with_encoding(&mut out, TransferEncoding::Base64)
        .unwrap();
    let (headers, body) = split_message(&out, LineEnding::CrLf);
    assert!(headers.contains("Content-Transfer-Encoding: base64"));
    let joined: String = String::from_utf8(body).unwrap().split("\r\n").collect();
    assert_eq!(decode_base64(&joined).unwrap(), b"short ascii body");
}

#[test]
fn test_lf_output_is_crlf_output_with_bare_newlines() {
    let build = || {
        Part::new(ContentType::multipart_mixed())
            .with_boundary("b")
            .with_child(Part::text("alpha beta gamma"))
            .with_child(Part::new(ContentType::octet_stream()).with_content(vec![0xEE; 32]))
    };

    let crlf = encode_crlf(&mut build());
    let mut lf = Vec::new();
    build().encode_custom(&mut lf, None, LineEnding::Lf).unwrap();

    let crlf_text = String::from_utf8(crlf).unwrap();
    assert_eq!(lf, crlf_text.replace("\r\n", "\n").as_bytes());
}

#[test]
fn test_sink_failure_aborts_encode() {
    let mut part = Part::text("body");
    let err = part.encode(FailingWriter).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got: {err}");
}

#[test]
fn test_source_failure_aborts_encode() {
    let mut part =
        Part::new(ContentType::octet_stream()).with_content_source(FailingReader { remaining: 10 });
    let mut out = Vec::new();
    let err = part.encode(&mut out).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "got: {err}");
}
