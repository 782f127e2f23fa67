//! MIME encoding and decoding utilities.
//!
//! Covers transfer-encoding selection, Base64 and Quoted-Printable content
//! codecs (buffered and streaming), and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::io::{self, Read, Write};

/// Percent of binary bytes tolerated before Base64 is chosen over
/// Quoted-Printable.
const BASE64_PERCENT: usize = 20;

/// Longest line content may contain and still qualify as 7bit.
const MAX_SEVEN_BIT_LINE: usize = 78;

/// Length of an encoded Base64 output line.
const BASE64_LINE_LEN: usize = 76;

/// Input bytes per Base64 output line; exact since the line length is
/// divisible by 4.
const BASE64_LINE_BYTES: usize = BASE64_LINE_LEN * 3 / 4;

/// Complete output lines per chunk on the streaming path.
const LINES_PER_CHUNK: usize = 128;

/// Read buffer size for the streaming encoder; a whole number of lines.
pub(crate) const READ_CHUNK_SIZE: usize = BASE64_LINE_BYTES * LINES_PER_CHUNK;

/// Longest run of content characters per Quoted-Printable output line,
/// leaving room for the soft break marker.
const QP_LINE_LEN: usize = 75;

/// Maximum length of one RFC 2047 encoded-word, delimiters included.
const MAX_ENCODED_WORD_LEN: usize = 75;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Output line-ending convention, applied uniformly to an encoded message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    /// `\r\n`, as required on the wire.
    #[default]
    CrLf,
    /// `\n` only, for local storage and tooling that expects it.
    Lf,
}

impl LineEnding {
    /// Returns the terminator byte sequence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrLf => "\r\n",
            Self::Lf => "\n",
        }
    }
}

/// Content transfer encoding schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII with short lines; the RFC 2045 default.
    SevenBit,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Parses a transfer encoding from a header value.
    ///
    /// Unrecognized values fall back to 7bit, which RFC 2045 assumes when no
    /// Content-Transfer-Encoding header is present.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }

    /// Selects the transfer encoding for a run of content bytes.
    ///
    /// Scans once, counting bytes outside printable ASCII (tab excepted) and
    /// tracking the longest line. Returns `Base64` as soon as the binary
    /// count reaches 20% of the input length, `SevenBit` for clean content
    /// whose lines stay within 78 bytes, and `QuotedPrintable` otherwise.
    ///
    /// With `quote_line_breaks` set, CR and LF count as binary bytes; body
    /// content passes `false` so line structure is transparent, while header
    /// values and filenames pass `true`.
    #[must_use]
    pub fn detect(content: &[u8], quote_line_breaks: bool) -> Self {
        if content.is_empty() {
            return Self::SevenBit;
        }
        // Binary bytes remaining before Base64 wins.
        let threshold = content.len() * BASE64_PERCENT / 100;
        let mut binary = 0;
        let mut longest = 0;
        let mut line = 0;
        for &b in content {
            if b == b'\n' || b == b'\r' {
                longest = longest.max(line);
                line = 0;
            } else {
                line += 1;
            }
            if (b < b' ' || b > b'~') && b != b'\t' {
                if !quote_line_breaks && (b == b'\r' || b == b'\n') {
                    continue;
                }
                binary += 1;
                if binary >= threshold {
                    return Self::Base64;
                }
            }
        }
        longest = longest.max(line);
        if binary == 0 && longest <= MAX_SEVEN_BIT_LINE {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// Encodes data as Base64 without line wrapping.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Writes `content` Base64 encoded, wrapped at 76 characters per line, each
/// line terminated per `line_ending`.
///
/// # Errors
///
/// Returns an error if the sink fails.
pub fn write_base64<W: Write + ?Sized>(
    w: &mut W,
    content: &[u8],
    line_ending: LineEnding,
) -> io::Result<()> {
    let encoded = STANDARD.encode(content);
    for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        w.write_all(line)?;
        w.write_all(line_ending.as_str().as_bytes())?;
    }
    Ok(())
}

/// Writes Base64 encoded content from a reader in bounded-memory chunks.
///
/// At most one chunk (128 output lines' worth of input) is buffered at a
/// time, so memory use is independent of the total content length. Short
/// reads are tolerated; end-of-stream ends the encode cleanly. The output is
/// byte-identical to [`write_base64`] over the same bytes.
///
/// # Errors
///
/// Returns an error if the source or the sink fails.
pub fn write_base64_stream<R, W>(w: &mut W, source: &mut R, line_ending: LineEnding) -> io::Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        // Fill the chunk completely unless the source runs dry first.
        let mut filled = 0;
        while filled < chunk.len() {
            let n = source.read(&mut chunk[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        for group in chunk[..filled].chunks(BASE64_LINE_BYTES) {
            w.write_all(STANDARD.encode(group).as_bytes())?;
            w.write_all(line_ending.as_str().as_bytes())?;
        }
        if filled < chunk.len() {
            return Ok(());
        }
    }
}

/// Writes `content` in RFC 2045 Quoted-Printable form.
///
/// CRLF pairs become hard line breaks in the active line-ending mode (LF-only
/// output thus normalizes CRLF to LF); lone CR and LF bytes are hex-escaped
/// so decoding CRLF-mode output recovers the input byte-for-byte. Soft line
/// breaks keep every output line within 76 columns, and a trailing space or
/// tab before a hard break or at end of content is hex-escaped.
///
/// # Errors
///
/// Returns an error if the sink fails.
pub fn write_quoted_printable<W: Write + ?Sized>(
    w: &mut W,
    content: &[u8],
    line_ending: LineEnding,
) -> io::Result<()> {
    let terminator = line_ending.as_str().as_bytes();
    let mut line: Vec<u8> = Vec::with_capacity(QP_LINE_LEN + 1);
    let mut i = 0;
    while i < content.len() {
        let b = content[i];
        if b == b'\r' && content.get(i + 1) == Some(&b'\n') {
            escape_trailing_whitespace(w, &mut line, terminator)?;
            w.write_all(&line)?;
            line.clear();
            w.write_all(terminator)?;
            i += 2;
            continue;
        }
        match b {
            b'!'..=b'<' | b'>'..=b'~' | b' ' | b'\t' => {
                if line.len() >= QP_LINE_LEN {
                    soft_break(w, &mut line, terminator)?;
                }
                line.push(b);
            }
            _ => push_escaped(w, &mut line, b, terminator)?,
        }
        i += 1;
    }
    escape_trailing_whitespace(w, &mut line, terminator)?;
    w.write_all(&line)
}

/// Encodes content as Quoted-Printable with CRLF line breaks.
#[must_use]
pub fn encode_quoted_printable(content: &[u8]) -> String {
    let mut out = Vec::with_capacity(content.len() + content.len() / 3);
    // Writing into a Vec cannot fail.
    let _ = write_quoted_printable(&mut out, content, LineEnding::CrLf);
    String::from_utf8_lossy(&out).into_owned()
}

fn soft_break<W: Write + ?Sized>(
    w: &mut W,
    line: &mut Vec<u8>,
    terminator: &[u8],
) -> io::Result<()> {
    w.write_all(line)?;
    w.write_all(b"=")?;
    w.write_all(terminator)?;
    line.clear();
    Ok(())
}

fn push_escaped<W: Write + ?Sized>(
    w: &mut W,
    line: &mut Vec<u8>,
    b: u8,
    terminator: &[u8],
) -> io::Result<()> {
    if line.len() + 3 > QP_LINE_LEN {
        soft_break(w, line, terminator)?;
    }
    line.push(b'=');
    line.push(HEX[usize::from(b >> 4)]);
    line.push(HEX[usize::from(b & 0x0f)]);
    Ok(())
}

/// A space or tab at the end of an encoded line would be ambiguous under
/// RFC 2045 and is escaped instead.
fn escape_trailing_whitespace<W: Write + ?Sized>(
    w: &mut W,
    line: &mut Vec<u8>,
    terminator: &[u8],
) -> io::Result<()> {
    if let Some(&last) = line.last() {
        if last == b' ' || last == b'\t' {
            line.pop();
            push_escaped(w, line, last, terminator)?;
        }
    }
    Ok(())
}

/// Decodes Quoted-Printable content (RFC 2045).
///
/// Handles hex escapes and soft line breaks; hard line breaks pass through
/// unchanged.
///
/// # Errors
///
/// Returns an error if the input contains an invalid or truncated escape.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }
        // Soft line break: "=\r\n" or "=\n".
        if data.get(i + 1) == Some(&b'\r') && data.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if data.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }
        let hex = data.get(i + 1..i + 3).ok_or_else(|| {
            Error::InvalidEncoding("incomplete quoted-printable escape".to_string())
        })?;
        out.push(hex_digit(hex[0])? << 4 | hex_digit(hex[1])?);
        i += 3;
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(Error::InvalidEncoding(format!(
            "invalid hex digit: {}",
            c as char
        ))),
    }
}

/// Encodes a header value as RFC 2047 encoded-words when it is not 7bit
/// clean, splitting long values into words of at most 75 columns so folding
/// can keep every header line within limits.
///
/// The word scheme (B or Q) follows the same heuristic as content encoding,
/// with line breaks treated as binary. 7bit-clean values are returned
/// unmodified.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    match TransferEncoding::detect(value.as_bytes(), true) {
        TransferEncoding::SevenBit => value.to_string(),
        TransferEncoding::Base64 => encode_words(value, WordScheme::B),
        TransferEncoding::QuotedPrintable => encode_words(value, WordScheme::Q),
    }
}

#[derive(Debug, Clone, Copy)]
enum WordScheme {
    B,
    Q,
}

fn encode_words(value: &str, scheme: WordScheme) -> String {
    // "=?utf-8?B?" + payload + "?=" must stay within the word limit.
    let payload_max = MAX_ENCODED_WORD_LEN - "=?utf-8?B??=".len();
    let budget = match scheme {
        // Base64 expands 3 input bytes to 4 payload chars.
        WordScheme::B => payload_max / 4 * 3,
        WordScheme::Q => payload_max,
    };
    let mut words: Vec<String> = Vec::new();
    let mut chunk = String::new();
    let mut cost = 0;
    for ch in value.chars() {
        let add = match scheme {
            WordScheme::B => ch.len_utf8(),
            WordScheme::Q => q_encoded_len(ch),
        };
        if cost + add > budget && !chunk.is_empty() {
            words.push(encode_word(&chunk, scheme));
            chunk.clear();
            cost = 0;
        }
        chunk.push(ch);
        cost += add;
    }
    if !chunk.is_empty() {
        words.push(encode_word(&chunk, scheme));
    }
    // Whitespace between adjacent encoded-words is transparent to decoders.
    words.join(" ")
}

fn q_encoded_len(ch: char) -> usize {
    if ch == ' ' || (ch.is_ascii() && is_q_literal(ch as u8)) {
        1
    } else {
        3 * ch.len_utf8()
    }
}

const fn is_q_literal(b: u8) -> bool {
    b >= b'!' && b <= b'~' && b != b'=' && b != b'?' && b != b'_'
}

fn encode_word(chunk: &str, scheme: WordScheme) -> String {
    match scheme {
        WordScheme::B => format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes())),
        WordScheme::Q => {
            let mut payload = String::new();
            for &b in chunk.as_bytes() {
                if b == b' ' {
                    payload.push('_');
                } else if is_q_literal(b) {
                    payload.push(b as char);
                } else {
                    payload.push('=');
                    payload.push(HEX[usize::from(b >> 4)] as char);
                    payload.push(HEX[usize::from(b & 0x0f)] as char);
                }
            }
            format!("=?utf-8?Q?{payload}?=")
        }
    }
}

/// Decodes RFC 2047 encoded-words in a header value.
///
/// Whitespace between adjacent encoded-words is dropped per RFC 2047; plain
/// tokens pass through unchanged.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed or uses an unknown
/// scheme.
pub fn decode_rfc2047(value: &str) -> Result<String> {
    let mut out = String::new();
    let mut prev_encoded = false;
    for (i, token) in value.split(' ').enumerate() {
        let is_encoded = token.len() >= 6 && token.starts_with("=?") && token.ends_with("?=");
        if i > 0 && !(prev_encoded && is_encoded) {
            out.push(' ');
        }
        if is_encoded {
            out.push_str(&decode_word(token)?);
        } else {
            out.push_str(token);
        }
        prev_encoded = is_encoded;
    }
    Ok(out)
}

fn decode_word(word: &str) -> Result<String> {
    let inner = &word[2..word.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidEncoding("malformed encoded-word".to_string()));
    }
    let text = parts[2];
    match parts[1].to_uppercase().as_str() {
        "B" => {
            let decoded = decode_base64(text)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => {
            let unescaped = decode_quoted_printable(text.replace('_', " ").as_bytes())?;
            String::from_utf8(unescaped).map_err(Into::into)
        }
        scheme => Err(Error::InvalidEncoding(format!(
            "unknown encoded-word scheme: {scheme}"
        ))),
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
    use proptest::prelude::*;

    fn qp(content: &[u8], line_ending: LineEnding) -> Vec<u8> {
        let mut out = Vec::new();
        write_quoted_printable(&mut out, content, line_ending).unwrap();
        out
    }

    #[test]
    fn test_detect_empty_is_seven_bit() {
        assert_eq!(
            TransferEncoding::detect(b"", false),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_detect_short_ascii_is_seven_bit() {
        assert_eq!(
            TransferEncoding::detect(b"Hello, World!\r\n", false),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_detect_tab_is_not_binary() {
        assert_eq!(
            TransferEncoding::detect(b"col1\tcol2\tcol3", false),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_detect_long_line_is_quoted_printable() {
        let content = vec![b'a'; 100];
        assert_eq!(
            TransferEncoding::detect(&content, false),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_detect_line_breaks_reset_line_length() {
        let mut content = vec![b'a'; 70];
        content.push(b'\n');
        content.extend_from_slice(&vec![b'a'; 70]);
        assert_eq!(
            TransferEncoding::detect(&content, false),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_detect_sparse_binary_is_quoted_printable() {
        // One binary byte in fifty stays under the 20% cutoff.
        let mut content = vec![b'a'; 49];
        content.push(0xC3);
        assert_eq!(
            TransferEncoding::detect(&content, false),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_detect_heavy_binary_is_base64() {
        let mut content = vec![b'a'; 7];
        content.extend_from_slice(&[0x80, 0x81, 0x82]);
        assert_eq!(
            TransferEncoding::detect(&content, false),
            TransferEncoding::Base64
        );
    }

    #[test]
    fn test_detect_early_exit_on_binary_prefix() {
        // 20% binary within the prefix: the scan must not wait for the tail.
        let mut content = vec![0u8; 200];
        content.extend_from_slice(&vec![b'a'; 800]);
        assert_eq!(
            TransferEncoding::detect(&content, false),
            TransferEncoding::Base64
        );
    }

    #[test]
    fn test_detect_line_breaks_opaque_mode() {
        // Body mode sees clean text; header mode counts the breaks as binary.
        let content = b"a\nb\nc\nd\n";
        assert_eq!(
            TransferEncoding::detect(content, false),
            TransferEncoding::SevenBit
        );
        assert_eq!(
            TransferEncoding::detect(content, true),
            TransferEncoding::Base64
        );
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::parse("bogus"),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_transfer_encoding_display() {
        assert_eq!(TransferEncoding::SevenBit.to_string(), "7bit");
        assert_eq!(
            TransferEncoding::QuotedPrintable.to_string(),
            "quoted-printable"
        );
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_write_base64_wraps_at_76() {
        let content = vec![0xABu8; 100];
        let mut out = Vec::new();
        write_base64(&mut out, &content, LineEnding::CrLf).unwrap();
        let text = String::from_utf8(out).unwrap();
        for line in text.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        let joined: String = text.split("\r\n").collect();
        assert_eq!(decode_base64(&joined).unwrap(), content);
    }

    #[test]
    fn test_write_base64_lf_mode() {
        let mut out = Vec::new();
        write_base64(&mut out, b"hello", LineEnding::Lf).unwrap();
        assert_eq!(out, b"aGVsbG8=\n");
    }

    #[test]
    fn test_base64_stream_matches_buffered() {
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut buffered = Vec::new();
        write_base64(&mut buffered, &content, LineEnding::CrLf).unwrap();

        let mut streamed = Vec::new();
        write_base64_stream(&mut streamed, &mut content.as_slice(), LineEnding::CrLf).unwrap();
        assert_eq!(streamed, buffered);
    }

    #[test]
    fn test_base64_stream_tolerates_short_reads() {
        struct Dribble<'a>(&'a [u8]);
        impl Read for Dribble<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = self.0.len().min(buf.len()).min(3);
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let content: Vec<u8> = (0..500u32).map(|i| (i % 256) as u8).collect();
        let mut buffered = Vec::new();
        write_base64(&mut buffered, &content, LineEnding::Lf).unwrap();

        let mut streamed = Vec::new();
        write_base64_stream(&mut streamed, &mut Dribble(&content), LineEnding::Lf).unwrap();
        assert_eq!(streamed, buffered);
    }

    #[test]
    fn test_quoted_printable_plain_ascii_unchanged() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_escapes_non_ascii() {
        let encoded = encode_quoted_printable("Héllo".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_escapes_equals_sign() {
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_soft_breaks_long_lines() {
        let content = vec![b'x'; 100];
        let encoded = encode_quoted_printable(&content);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {}", line.len());
        }
        assert_eq!(decode_quoted_printable(encoded.as_bytes()).unwrap(), content);
    }

    #[test]
    fn test_quoted_printable_hard_break_crlf() {
        assert_eq!(encode_quoted_printable(b"one\r\ntwo"), "one\r\ntwo");
    }

    #[test]
    fn test_quoted_printable_lone_line_break_bytes_escaped() {
        assert_eq!(encode_quoted_printable(b"a\nb"), "a=0Ab");
        assert_eq!(encode_quoted_printable(b"a\rb"), "a=0Db");
    }

    #[test]
    fn test_quoted_printable_lf_mode_normalizes_breaks() {
        assert_eq!(qp(b"one\r\ntwo", LineEnding::Lf), b"one\ntwo");
    }

    #[test]
    fn test_quoted_printable_trailing_space_escaped() {
        assert_eq!(encode_quoted_printable(b"a \r\nb"), "a=20\r\nb");
        assert_eq!(encode_quoted_printable(b"ends with tab\t"), "ends with tab=09");
    }

    #[test]
    fn test_quoted_printable_decode_soft_break() {
        assert_eq!(
            decode_quoted_printable(b"Hello=\r\nWorld").unwrap(),
            b"HelloWorld"
        );
    }

    #[test]
    fn test_quoted_printable_decode_rejects_truncated_escape() {
        assert!(decode_quoted_printable(b"abc=4").is_err());
        assert!(decode_quoted_printable(b"abc=ZZ").is_err());
    }

    #[test]
    fn test_rfc2047_plain_ascii_unchanged() {
        assert_eq!(encode_header_value("Hello"), "Hello");
    }

    #[test]
    fn test_rfc2047_b_encoding_for_mostly_binary() {
        let encoded = encode_header_value("Héllo");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_encoding_for_mostly_ascii() {
        let value = "A mostly ascii value with one stray é in the middle";
        let encoded = encode_header_value(value);
        assert!(encoded.starts_with("=?utf-8?Q?"), "got: {encoded}");
        assert_eq!(decode_rfc2047(&encoded).unwrap(), value);
    }

    #[test]
    fn test_rfc2047_words_stay_within_limit() {
        let value = "é".repeat(120);
        let encoded = encode_header_value(&value);
        for word in encoded.split(' ') {
            assert!(word.len() <= 75, "word too long: {}", word.len());
        }
        assert_eq!(decode_rfc2047(&encoded).unwrap(), value);
    }

    #[test]
    fn test_rfc2047_decode_q_underscore_is_space() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?=").unwrap(), "Héllo there");
    }

    #[test]
    fn test_rfc2047_decode_rejects_unknown_scheme() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2047_decode_leaves_plain_tokens() {
        assert_eq!(decode_rfc2047("no encoding here").unwrap(), "no encoding here");
    }

    fn is_seven_bit_clean(content: &[u8]) -> bool {
        let printable = content
            .iter()
            .all(|&b| (b' '..=b'~').contains(&b) || matches!(b, b'\t' | b'\r' | b'\n'));
        let longest = content
            .split(|&b| b == b'\n' || b == b'\r')
            .map(<[u8]>::len)
            .max()
            .unwrap_or(0);
        printable && longest <= 78
    }

    proptest! {
        #[test]
        fn prop_base64_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let encoded = encode_base64(&data);
            prop_assert_eq!(decode_base64(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let encoded = qp(&data, LineEnding::CrLf);
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_line_limit(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let encoded = qp(&data, LineEnding::CrLf);
            for line in encoded.split(|&b| b == b'\n') {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                prop_assert!(line.len() <= 76);
            }
        }

        #[test]
        fn prop_seven_bit_detection_matches_definition(
            data in proptest::collection::vec(any::<u8>(), 1..512)
        ) {
            let detected = TransferEncoding::detect(&data, false);
            prop_assert_eq!(
                detected == TransferEncoding::SevenBit,
                is_seven_bit_clean(&data)
            );
        }
    }
}
