//! # pw-client
//!
//! Client for the opaque code-generation service, used only by the
//! network-enabled generation pass. The network-isolated injection pass must
//! never link this crate.
//!
//! The service is treated as an opaque function: request in, structured code
//! text or failure out. One request per directive, no internal retries;
//! retry is an emergent property of cache semantics (a failure writes no
//! cache entry, so the next generation run simply asks again).

pub mod client;
pub mod env;
pub mod generation;

pub use client::{ClaudeClient, ClaudeConfig, ClientError, Completion, Message, Role};
pub use env::load_env_file;
pub use generation::{generate, GenerationRequest};
