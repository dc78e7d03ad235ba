//! # pw-inject
//!
//! The compile-time half of the pipeline. Runs once per compiled file,
//! synchronously, with the persisted cache available but no network access;
//! this crate must never link the generation client.
//!
//! The injector independently re-derives the file's directive set with the
//! scanner's algorithm, looks each directive up in the cache, and on a hit
//! re-parses the cached code as a body block and splices it into the
//! function, leaving the signature untouched. Misses are non-fatal: the
//! directive-only body stays, and the function performs no user-visible
//! action when called. Cached code that fails to re-parse downgrades to a
//! miss rather than failing the file.
//!
//! Before any body is spliced, import-name collisions between the generated
//! code's required symbols and the host file's existing imports are resolved:
//! existing imports of the same canonical symbol are reused, free
//! conventional names are imported directly, and taken names get a fresh
//! alias with all generated references rewritten. The whole rewrite is a
//! pure function of `(source text, cache snapshot)`: deterministic and
//! idempotent, as build systems re-invoke compilation of unchanged files.

mod analyze;
mod config;
mod imports;
mod injector;
mod rewrite;

pub use config::InjectorConfig;
pub use imports::HostBindings;
pub use injector::{inject_source, render, InjectError, InjectOutcome};
