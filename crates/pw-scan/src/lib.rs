//! # pw-scan
//!
//! Directive extraction from parsed Rust sources.
//!
//! Both pipeline passes run this scanner independently and must agree on
//! directive identity without any shared process state, so everything here
//! is a pure function of the source text. The traversal is a typed visitor
//! over the `syn` tree: every function with a concrete body is inspected
//! (free functions, impl methods, trait default methods), including
//! functions nested inside other function bodies. Matched bodies are not
//! pruned; nested directive functions are each collected independently.
//!
//! A function qualifies when its body *prologue* (the leading run of
//! expression statements that are plain string literals) contains a string
//! with the exact prefix `use prompt:` and a non-empty trimmed remainder.

pub mod prologue;
mod scanner;

pub use prologue::{prologue_prompt, PromptScan};
pub use scanner::{directive_at, header_span, scan_file, scan_source, ScanError};
