//! # caskdb Server
//!
//! Request boundary for the caskdb engine.
//!
//! This crate provides:
//! - A closed [`Request`] type decoded once from the line protocol
//! - A [`Dispatcher`] that runs requests on a bounded worker pool and
//!   replies per connection in submission order
//! - A [`CompactionTrigger`] that requests compaction once the segment
//!   directory grows past a threshold
//! - [`ServerConfig`], readable from `CASKDB_*` environment variables
//!
//! Accepting connections is left to the embedding transport: anything that
//! yields an async reader and writer per connection can drive
//! [`Server::serve_connection`].
//!
//! # Protocol
//!
//! ```text
//! w <key> <value> [--no-reply]   -> nothing
//! r <key>                        -> value, or nothing if absent
//! a <dir> <name>                 -> the exported table
//! ```
//!
//! Failures reply `ERR <message>`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatcher;
mod error;
mod request;
mod server;
mod trigger;

pub use config::{
    ServerConfig, DEFAULT_COMPACTION_INTERVAL, DEFAULT_COMPACTION_THRESHOLD, DEFAULT_PORT,
    DEFAULT_WORKERS,
};
pub use dispatcher::{ConnectionSummary, Dispatcher, Reply};
pub use error::{ServerError, ServerResult};
pub use request::{Request, NO_REPLY};
pub use server::Server;
pub use trigger::CompactionTrigger;
