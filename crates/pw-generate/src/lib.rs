//! # pw-generate
//!
//! The network-enabled half of the pipeline. Scans source files for
//! directives, requests implementations for the ones the cache does not
//! already answer, and persists the merged cache in one atomic write.
//!
//! Within a file all pending directives are dispatched concurrently
//! (fan-out/fan-in); each directive's success or failure is independent.
//! Files are processed sequentially. There is no cancellation: a failure
//! becomes "no result", writes nothing, and is retried by whichever
//! generation run comes next. The cache is the only retry mechanism.

mod pass;

pub use pass::{scan_only, FileReport, GenerateConfig, GenerateError, GenerationPass, RunReport};
