//! # mimewrite
//!
//! Streaming MIME message generation library for email.
//!
//! ## Features
//!
//! - **Part trees**: Compose single and multipart messages as an owned tree
//!   of parts with nested children
//! - **Transfer-encoding selection**: Automatic 7bit / quoted-printable /
//!   base64 choice from the content bytes (RFC 2045/2049)
//! - **Streaming bodies**: Encode content from any reader in bounded-memory
//!   chunks, independent of total size
//! - **Header encoding**: RFC 2047 encoded-words for non-ASCII values, with
//!   deterministic ordering and 76-column folding
//! - **Boundaries**: Pluggable boundary-token generation for multipart
//!   framing (RFC 2046)
//!
//! ## Quick Start
//!
//! ```ignore
//! use mimewrite::Part;
//!
//! let mut part = Part::text("Hello, World!\r\n");
//! let mut out = Vec::new();
//! part.encode(&mut out)?;
//! // Content-Type: text/plain; charset=utf-8
//! //
//! // Hello, World!
//! ```
//!
//! ### Multipart Messages
//!
//! ```ignore
//! use mimewrite::{ContentType, Part};
//!
//! let mut message = Part::new(ContentType::multipart_alternative())
//!     .with_child(Part::text("Plain text version"))
//!     .with_child(
//!         Part::new(ContentType::text_html())
//!             .with_content("<h1>HTML version</h1>".as_bytes().to_vec()),
//!     );
//!
//! let mut out = Vec::new();
//! message.encode(&mut out)?;
//! ```
//!
//! ### Streaming Attachments
//!
//! ```ignore
//! use mimewrite::{ContentType, Part};
//! use std::fs::File;
//!
//! let file = File::open("archive.tar.gz")?;
//! let mut part = Part::new(ContentType::octet_stream())
//!     .with_content_source(file)
//!     .with_disposition("attachment")
//!     .with_file_name("archive.tar.gz");
//!
//! // Base64 output is produced one bounded chunk at a time.
//! part.encode(std::io::stdout())?;
//! ```
//!
//! ### Line Endings and Encoding Control
//!
//! ```ignore
//! use mimewrite::{LineEnding, Part, TransferEncoding};
//!
//! let mut part = Part::text("forced quoted-printable");
//! let mut out = Vec::new();
//! part.encode_custom(&mut out, Some(TransferEncoding::QuotedPrintable), LineEnding::Lf)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod boundary;
mod content_type;
mod encode;
mod error;
mod header;
mod part;

pub mod encoding;

pub use boundary::{BoundaryGenerator, RandomBoundaryGenerator, SequentialBoundaryGenerator};
pub use content_type::ContentType;
pub use encoding::{LineEnding, TransferEncoding};
pub use error::{Error, Result};
pub use header::Headers;
pub use part::Part;
