//! Stream transport: pure wire plumbing.
//!
//! A [`WatchConnector`] mints one bidirectional ordered channel to a server
//! endpoint, split into a [`WatchSink`] (requests out) and a
//! [`WatchSource`] (responses in). The multiplexer owns the sink; a
//! dedicated reader task ([`serve_source`]) pumps the source into the
//! multiplexer's response channel and reports the first read failure.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use revkv_proto::codec::{decode_frame, encode_frame};
use revkv_proto::watch::{WatchRequest, WatchResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::context::{StreamMetadata, WatchContext};
use crate::error::WatchError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Outbound half of a watch transport. Only the multiplexer scheduler
/// calls `send`.
#[async_trait]
pub trait WatchSink: Send + 'static {
    async fn send(&mut self, frame: WatchRequest) -> Result<(), WatchError>;
}

/// Inbound half of a watch transport. Only the reader task calls `recv`.
#[async_trait]
pub trait WatchSource: Send + 'static {
    async fn recv(&mut self) -> Result<WatchResponse, WatchError>;
}

pub struct WatchChannel {
    pub sink: Box<dyn WatchSink>,
    pub source: Box<dyn WatchSource>,
}

/// Mints watch transports. One connector is shared by every stream of a
/// watcher; each stream connects independently.
#[async_trait]
pub trait WatchConnector: Send + Sync + 'static {
    async fn connect(&self, metadata: &StreamMetadata) -> Result<WatchChannel, WatchError>;
}

/// Forwards frames from a transport source to the multiplexer.
///
/// Pushes exactly one error onto `errc` on read failure, then exits. Exits
/// silently when the multiplexer goes away or its context ends.
pub(crate) async fn serve_source(
    mut source: Box<dyn WatchSource>,
    respc: mpsc::Sender<WatchResponse>,
    errc: mpsc::Sender<WatchError>,
    ctx: WatchContext,
) {
    loop {
        tokio::select! {
            res = source.recv() => match res {
                Ok(resp) => {
                    trace!(watch_id = resp.watch_id, "transport frame received");
                    if respc.send(resp).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = errc.send(err).await;
                    return;
                }
            },
            _ = ctx.cancelled() => return,
        }
    }
}

/// TCP transport speaking the length-prefixed frame codec.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoints: Vec<String>,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl WatchConnector for TcpConnector {
    async fn connect(&self, _metadata: &StreamMetadata) -> Result<WatchChannel, WatchError> {
        if self.endpoints.is_empty() {
            return Err(WatchError::Halted("no endpoints configured".into()));
        }

        // Balance across endpoints; a watch stream may land on any member.
        let mut rng = StdRng::from_entropy();
        let endpoint = &self.endpoints[rng.gen_range(0..self.endpoints.len())];

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|_| WatchError::Connect(format!("connect to {endpoint} timed out")))?
            .map_err(|e| WatchError::Connect(format!("{endpoint}: {e}")))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(endpoint = %endpoint, error = %e, "failed to set TCP_NODELAY");
        }

        debug!(endpoint = %endpoint, "watch transport connected");
        let (reader, writer) = stream.into_split();
        Ok(WatchChannel {
            sink: Box::new(TcpSink {
                writer,
                buf: BytesMut::new(),
            }),
            source: Box::new(TcpSource {
                reader,
                buf: BytesMut::with_capacity(8 * 1024),
            }),
        })
    }
}

struct TcpSink {
    writer: OwnedWriteHalf,
    buf: BytesMut,
}

#[async_trait]
impl WatchSink for TcpSink {
    async fn send(&mut self, frame: WatchRequest) -> Result<(), WatchError> {
        self.buf.clear();
        encode_frame(&frame, &mut self.buf)?;
        self.writer
            .write_all(&self.buf)
            .await
            .map_err(|e| WatchError::Transport(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| WatchError::Transport(e.to_string()))
    }
}

struct TcpSource {
    reader: OwnedReadHalf,
    buf: BytesMut,
}

#[async_trait]
impl WatchSource for TcpSource {
    async fn recv(&mut self) -> Result<WatchResponse, WatchError> {
        loop {
            if let Some(resp) = decode_frame::<WatchResponse>(&mut self.buf)? {
                return Ok(resp);
            }
            let n = self
                .reader
                .read_buf(&mut self.buf)
                .await
                .map_err(|e| WatchError::Transport(e.to_string()))?;
            if n == 0 {
                return Err(WatchError::Transport("connection closed by peer".into()));
            }
        }
    }
}
