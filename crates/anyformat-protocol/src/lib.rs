//! anyformat Protocol — Shared JSON-RPC 2.0 types, document and history records.
//!
//! This crate contains no I/O or async code. It defines the message types
//! exchanged between the CLI and the daemon, and the records the daemon
//! persists.

mod document;
mod history;
mod jsonrpc;

pub use document::*;
pub use history::*;
pub use jsonrpc::*;
