//! Host shell bridge over line-delimited JSON.

mod stdio;

pub use stdio::{InboundReader, LineBridge};
