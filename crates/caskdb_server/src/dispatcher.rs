//! Request execution and per-connection serving.

use crate::error::{ServerError, ServerResult};
use crate::request::Request;
use caskdb_core::Engine;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome of executing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to send back.
    None,
    /// Raw payload, sent followed by a newline.
    Value(Vec<u8>),
    /// Failure, sent as `ERR <message>`.
    Error(String),
}

impl Reply {
    /// Encodes the reply as one protocol line, or `None` if nothing is sent.
    pub fn to_line(&self) -> Option<Vec<u8>> {
        match self {
            Reply::None => None,
            Reply::Value(bytes) => {
                let mut line = Vec::with_capacity(bytes.len() + 1);
                line.extend_from_slice(bytes);
                line.push(b'\n');
                Some(line)
            }
            Reply::Error(message) => Some(format!("ERR {message}\n").into_bytes()),
        }
    }
}

impl From<ServerError> for Reply {
    fn from(err: ServerError) -> Self {
        Reply::Error(err.to_string())
    }
}

/// Counters for one served connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Requests executed.
    pub requests: usize,
    /// Reply lines written.
    pub replies: usize,
    /// Lines that were not valid requests.
    pub rejected: usize,
}

/// Executes requests against a shared engine.
///
/// Engine calls block, so they run on tokio's blocking pool. A semaphore
/// bounds how many run at once. Cloning is cheap and shares both.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    engine: Arc<Engine>,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    /// Creates a dispatcher allowing `workers` concurrent requests.
    pub fn new(engine: Arc<Engine>, workers: usize) -> Self {
        Self {
            engine,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Returns the engine requests run against.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Executes one request on the calling thread.
    pub fn execute(&self, request: Request) -> Reply {
        let result = match request {
            Request::Write { key, value, .. } => self.engine.put(key, &value).map(|()| Reply::None),
            Request::Read { key } => self
                .engine
                .get(key)
                .map(|value| value.map_or(Reply::None, Reply::Value)),
            Request::Export { dir, name } => self.engine.export(&dir, &name).map(Reply::Value),
            Request::Compact => self.engine.compact().map(|result| {
                debug!(
                    inputs = result.input_segments,
                    outputs = result.output_segments,
                    "compaction request finished"
                );
                Reply::None
            }),
        };

        result.unwrap_or_else(|err| {
            warn!(error = %err, "request failed");
            Reply::from(ServerError::Core(err))
        })
    }

    /// Executes one request on the blocking pool once a worker is free.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Join`] if the blocking task panicked.
    pub async fn submit(&self, request: Request) -> ServerResult<Reply> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| ServerError::Io(std::io::Error::other("worker pool is closed")))?;
        let dispatcher = self.clone();
        Ok(tokio::task::spawn_blocking(move || dispatcher.execute(request)).await?)
    }

    /// Serves one connection until its reader reaches end of stream.
    ///
    /// Each line becomes its own task; replies are written in the order the
    /// lines arrived, as soon as each one and all before it are done.
    /// Requests on one connection may execute concurrently.
    /// Unrecognized lines are logged and skipped without a reply.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing the stream fails.
    pub async fn serve_connection<R, W>(
        &self,
        reader: R,
        mut writer: W,
    ) -> ServerResult<ConnectionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<(JoinHandle<ServerResult<Reply>>, bool)>();

        let read_loop = async move {
            let mut lines = reader.split(b'\n');
            let mut summary = ConnectionSummary::default();

            while let Some(raw) = lines.next_segment().await? {
                let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
                if raw.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                let parsed = std::str::from_utf8(raw)
                    .map_err(|_| ServerError::InvalidRequest("line is not valid UTF-8".into()))
                    .and_then(Request::parse_client);
                let (request, expects_reply) = match parsed {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        warn!(error = %err, "unrecognized request line");
                        summary.rejected += 1;
                        continue;
                    }
                };

                debug!(?request, "request received");
                let dispatcher = self.clone();
                let handle = tokio::spawn(async move { dispatcher.submit(request).await });
                summary.requests += 1;
                if tx.send((handle, expects_reply)).is_err() {
                    break;
                }
            }
            Ok::<_, ServerError>(summary)
        };

        let write_loop = async {
            let mut replies = 0usize;
            while let Some((handle, expects_reply)) = rx.recv().await {
                let reply = match handle.await {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(err)) => Reply::from(err),
                    Err(err) => Reply::from(ServerError::Join(err)),
                };
                if !expects_reply {
                    continue;
                }
                if let Some(line) = reply.to_line() {
                    writer.write_all(&line).await?;
                    writer.flush().await?;
                    replies += 1;
                }
            }
            Ok::<_, ServerError>(replies)
        };

        let (mut summary, replies) = tokio::try_join!(read_loop, write_loop)?;
        summary.replies = replies;
        debug!(?summary, "connection finished");
        Ok(summary)
    }
}
