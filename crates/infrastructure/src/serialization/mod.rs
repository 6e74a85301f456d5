//! Deterministic JSON for files written by the client.
//!
//! Output uses 2-space indentation and ends with a newline; map keys keep
//! the order of their `BTreeMap` source.

mod json;

pub use json::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
