//! Boundary token generation for multipart framing.
//!
//! Generation sits behind a trait so encodes can be made deterministic under
//! test, and so independent encodes never contend on shared generator state.
//! Collision with wrapped content is not checked; the default token carries
//! 192 random bits, which makes an accidental match in a content line
//! vanishingly unlikely.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Prefix applied to generated boundary tokens.
const BOUNDARY_PREFIX: &str = "mimewrite-";

/// Source of multipart boundary tokens.
///
/// The only contract is low collision probability against the wrapped
/// content; cryptographic strength is not required. In production, use
/// [`RandomBoundaryGenerator`]. In tests, use [`SequentialBoundaryGenerator`]
/// for reproducible output.
pub trait BoundaryGenerator {
    /// Produces the next boundary token.
    fn generate(&mut self) -> String;
}

/// Boundary generator backed by the thread-local RNG.
///
/// Tokens are a fixed prefix plus 24 random bytes in URL-safe Base64; every
/// emitted character is valid in an RFC 2046 boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBoundaryGenerator;

impl BoundaryGenerator for RandomBoundaryGenerator {
    fn generate(&mut self) -> String {
        let token: [u8; 24] = rand::thread_rng().r#gen();
        format!("{BOUNDARY_PREFIX}{}", URL_SAFE_NO_PAD.encode(token))
    }
}

/// A deterministic boundary generator for testing.
///
/// Produces `<prefix>1`, `<prefix>2`, ... in order.
#[derive(Debug, Clone)]
pub struct SequentialBoundaryGenerator {
    prefix: String,
    next: usize,
}

impl SequentialBoundaryGenerator {
    /// Creates a generator with the given token prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl BoundaryGenerator for SequentialBoundaryGenerator {
    fn generate(&mut self) -> String {
        self.next += 1;
        format!("{}{}", self.prefix, self.next)
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

    #[test]
    fn test_random_tokens_are_prefixed_and_distinct() {
        let mut generator = RandomBoundaryGenerator;
        let a = generator.generate();
        let b = generator.generate();
        assert!(a.starts_with(BOUNDARY_PREFIX));
        assert!(b.starts_with(BOUNDARY_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_tokens_use_valid_boundary_characters() {
        // RFC 2046 bchars: alphanumerics plus a small punctuation set.
        let mut generator = RandomBoundaryGenerator;
        let token = generator.generate();
        assert!(token.len() <= 70);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(c))
        );
    }

    #[test]
    fn test_sequential_generator_counts_up() {
        let mut generator = SequentialBoundaryGenerator::new("test-");
        assert_eq!(generator.generate(), "test-1");
        assert_eq!(generator.generate(), "test-2");
        assert_eq!(generator.generate(), "test-3");
    }
}
