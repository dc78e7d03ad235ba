//! Directive and generation-result types.
//!
//! A directive marks a function whose implementation should be synthesized.
//! It is produced by the scanner, immutable once produced, and never
//! persisted directly; only its key fields (stub hash and prompt) address
//! cache entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Exact, case-sensitive prefix a prologue string must carry to count as a
/// directive.
pub const PROMPT_PREFIX: &str = "use prompt:";

/// Byte-offset span addressing a function within the original source text.
///
/// `start` points at the function header, `end` at the opening of the body.
/// Offsets are 0-based. Spans are diagnostic and stub-extraction data only;
/// cache entries are addressed by content hash, not position, so unrelated
/// edits earlier in a file cannot silently invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FnSpan {
    /// Byte offset of the function header start.
    pub start: usize,
    /// Byte offset of the body's opening brace.
    pub end: usize,
}

impl FnSpan {
    /// Create a span. `start` must not exceed `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }
}

/// A source marker denoting that a function's implementation should be
/// synthesized from natural language.
///
/// Produced by the scanner in traversal order; a function yields at most one
/// directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Location of the enclosing function in the original source.
    pub span: FnSpan,
    /// Trimmed directive text following the `use prompt:` prefix.
    pub prompt: String,
    /// Function header with an empty body, used to constrain generation.
    pub signature_stub: String,
}

impl Directive {
    /// Content-addressed cache key for this directive's function signature.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::of_stub(&self.signature_stub)
    }
}

/// Content hash identifying a function signature stub in the cache.
///
/// Lowercase hex SHA-256 of the stub text. Two independent passes running at
/// different times derive identical keys from identical source, with no
/// shared state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash a signature stub into a key.
    pub fn of_stub(stub: &str) -> Self {
        use std::fmt::Write;

        let digest = Sha256::digest(stub.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        Self(hex)
    }

    /// Wrap an already-computed hex key, as read back from the cache file.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A successful response from the generation service.
///
/// Written once into the cache, never mutated. Failure has no representation
/// here: a failed generation simply leaves no result, so the next generation
/// run treats the directive as not yet attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Function body content, excluding the header.
    pub code: String,
    /// Self-reported import list from the service. The client discards this
    /// (`None`); the injector resolves imports independently.
    pub imports: Option<String>,
}

impl GenerationResult {
    /// Result with the imports field discarded.
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            imports: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable() {
        let a = CacheKey::of_stub("fn cool_button(){}");
        let b = CacheKey::of_stub("fn cool_button(){}");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_depends_on_stub() {
        let a = CacheKey::of_stub("fn cool_button(){}");
        let b = CacheKey::of_stub("fn warm_button(){}");
        assert_ne!(a, b);
    }

    #[test]
    fn test_directive_key_uses_stub() {
        let directive = Directive {
            span: FnSpan::new(10, 28),
            prompt: "a button".to_string(),
            signature_stub: "fn cool_button(){}".to_string(),
        };
        assert_eq!(
            directive.cache_key(),
            CacheKey::of_stub("fn cool_button(){}")
        );
    }

    #[test]
    fn test_generation_result_discards_imports() {
        let result = GenerationResult::from_code("42");
        assert_eq!(result.code, "42");
        assert!(result.imports.is_none());
    }
}
