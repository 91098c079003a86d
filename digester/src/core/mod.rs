//! Deterministic, pure logic shared by the digest pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! strings and dates and return deterministic outputs suitable for tests.

pub mod assets;
pub mod frontmatter;
pub mod period;
pub mod schema;
pub mod types;
pub mod verdict;
