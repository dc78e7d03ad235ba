//! # pw-core
//!
//! Core types shared by both halves of the promptweld pipeline.
//!
//! The pipeline is split into two passes that never share process memory:
//!
//! 1. **Generation pass** (network-enabled): scans sources for `use prompt:`
//!    directives, asks the generation service for implementations, and
//!    persists the results into a cache artifact.
//! 2. **Injection pass** (network-isolated): re-scans the same sources,
//!    looks each directive up in the cache, and splices the generated body
//!    into the syntax tree before compilation.
//!
//! Both passes agree on directive identity through the types in this crate:
//! a [`Directive`] is addressed by the content hash of its signature stub
//! ([`CacheKey`]) together with its exact prompt string. Content addressing
//! keeps cache entries valid when unrelated edits shift byte offsets.

pub mod directive;
pub mod symbols;

pub use directive::{CacheKey, Directive, FnSpan, GenerationResult, PROMPT_PREFIX};
pub use symbols::{CanonicalSymbol, SymbolTable, SymbolTableError};
