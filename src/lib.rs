//! Black-box validation harness for the distributed image-upload service.
//!
//! A run generates a batch of upload files, feeds `upload <path>` commands to
//! the service's client process, scrapes the client's console output for
//! per-node markers and grades how evenly and reliably the three nodes
//! handled the work.

pub mod analyzer;
pub mod config;
pub mod driver;
pub mod evaluator;
pub mod glyph;
pub mod harness;
pub mod interrupt;
pub mod report;
pub mod script;
pub mod workload;
pub mod workspace;

/// Number of server nodes behind the client.
pub const NODE_COUNT: usize = 3;
