//! Cross-cutting runtime plumbing

pub mod shutdown;

pub use shutdown::*;
