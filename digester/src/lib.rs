//! Weekly research digest agent.
//!
//! Each run computes the reporting week, has a language model research and
//! write a Markdown digest, asks the model to review it, validates the
//! header, attaches a header image and saves the file. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (period math, header validation,
//!   verdict parsing, image rotation). No I/O.
//! - **[`io`]**: Side effects (HTTP client, retries, filesystem stores,
//!   issue escalation, run logs). Trait seams allow scripted fakes in tests.
//!
//! Orchestration modules ([`research`], [`review`], [`images`], [`run`])
//! combine the two to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod images;
pub mod io;
pub mod logging;
pub mod research;
pub mod review;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
