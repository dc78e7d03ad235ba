//! # pw-cache
//!
//! The persisted cache is the only channel between the two pipeline passes:
//! the generation pass writes it, the network-isolated injection pass reads
//! it. It is a store-and-forward artifact, never an in-process coupling.
//!
//! On disk the cache is UTF-8 JSON: a two-level object keyed first by the
//! signature-stub content hash, then by the exact prompt string, with
//! `{"code": ..., "imports": ...}` leaves. Both levels are `BTreeMap`s so a
//! persist of identical content is byte-identical.
//!
//! Reads are fail-safe: an absent or unparseable file is an empty cache
//! (accepted lossy recovery), never an error. Writes go through a sibling
//! temporary file plus atomic rename so concurrent readers never observe a
//! partial cache.

mod store;

pub use store::{Cache, CacheError};
