//! anyformat Daemon — Serves document and file-history requests over a Unix socket.

pub mod config;
pub mod handler;
pub mod server;
