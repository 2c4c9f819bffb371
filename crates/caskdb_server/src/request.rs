//! Request decoding for the line protocol.
//!
//! One request per line:
//!
//! ```text
//! w <key> <value>      write; the value runs to the end of the line
//! r <key>              read
//! a <dir> <name>       export every pair to dir/name
//! c                    compact (internal only)
//! ```
//!
//! `--no-reply` anywhere in a line is removed and turns off the reply.

use crate::error::{ServerError, ServerResult};
use caskdb_core::Key;
use std::path::PathBuf;

/// Marker that suppresses the reply to a request.
pub const NO_REPLY: &str = "--no-reply";

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Store `value` under `key`.
    Write {
        /// Key to write.
        key: Key,
        /// Value bytes.
        value: Vec<u8>,
        /// Whether the caller skips the acknowledgement.
        no_reply: bool,
    },
    /// Fetch the value of `key`.
    Read {
        /// Key to read.
        key: Key,
    },
    /// Export every live pair as a table.
    Export {
        /// Target directory.
        dir: PathBuf,
        /// File name within `dir`.
        name: String,
    },
    /// Run one compaction pass.
    Compact,
}

impl Request {
    /// Decodes one line, accepting every request kind.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] for an unknown tag, a missing
    /// argument or a key that is not a 64-bit integer.
    pub fn parse(line: &str) -> ServerResult<Self> {
        Self::parse_with_reply(line).map(|(request, _)| request)
    }

    /// Decodes one line from a client. `c` is rejected.
    ///
    /// Returns the request and whether the client expects a reply.
    ///
    /// # Errors
    ///
    /// Same as [`Request::parse`], plus compaction requests.
    pub fn parse_client(line: &str) -> ServerResult<(Self, bool)> {
        let (request, expects_reply) = Self::parse_with_reply(line)?;
        if request == Request::Compact {
            return Err(ServerError::InvalidRequest(
                "compaction cannot be requested by clients".into(),
            ));
        }
        Ok((request, expects_reply))
    }

    fn parse_with_reply(line: &str) -> ServerResult<(Self, bool)> {
        let expects_reply = !line.contains(NO_REPLY);
        let cleaned = line.replace(NO_REPLY, "");
        let cleaned = cleaned.trim();

        let (tag, rest) = match cleaned.split_once(' ') {
            Some((tag, rest)) => (tag, rest),
            None => (cleaned, ""),
        };

        let request = match tag {
            "w" => {
                let (key, value) = rest
                    .split_once(' ')
                    .ok_or_else(|| invalid("write needs a key and a value"))?;
                Request::Write {
                    key: parse_key(key)?,
                    value: value.as_bytes().to_vec(),
                    no_reply: !expects_reply,
                }
            }
            "r" => Request::Read {
                key: parse_key(rest)?,
            },
            "a" => {
                let (dir, name) = rest
                    .split_once(' ')
                    .ok_or_else(|| invalid("export needs a directory and a file name"))?;
                if dir.is_empty() || name.is_empty() {
                    return Err(invalid("export needs a directory and a file name"));
                }
                Request::Export {
                    dir: PathBuf::from(dir),
                    name: name.to_string(),
                }
            }
            "c" if rest.is_empty() => Request::Compact,
            "" => return Err(invalid("empty request")),
            other => return Err(invalid(format!("unrecognized request tag {other:?}"))),
        };

        Ok((request, expects_reply))
    }
}

fn parse_key(text: &str) -> ServerResult<Key> {
    text.parse()
        .map_err(|_| invalid(format!("key {text:?} is not a 64-bit integer")))
}

fn invalid(message: impl Into<String>) -> ServerError {
    ServerError::InvalidRequest(message.into())
}
