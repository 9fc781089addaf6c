// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Duplex connections for MCP over Unix domain sockets and TCP.
//!
//! A `Connection` is produced either by dialing an `Address` (client) or by
//! accepting on a `Listener` (server). Reads and writes go through
//! `McpCodec`, one JSON value at a time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use crate::core::errors::TransportError;
use crate::core::models::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::codec::{self, McpCodec};

/// Where to dial or listen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Filesystem path of a Unix domain socket
    Unix(PathBuf),
    /// `host:port`
    Tcp(String),
}

impl FromStr for Address {
    type Err = TransportError;

    /// Accepts `unix:<path>`, `tcp:<host:port>`, a bare path (anything with a
    /// `/`) or a bare `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }
        if let Some(hostport) = s.strip_prefix("tcp:") {
            return parse_tcp(hostport);
        }
        if s.contains('/') {
            return Ok(Address::Unix(PathBuf::from(s)));
        }
        parse_tcp(s)
    }
}

fn parse_tcp(s: &str) -> Result<Address, TransportError> {
    match s.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(Address::Tcp(s.to_string()))
        }
        _ => Err(TransportError::InvalidAddress(s.to_string())),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unix(p) => write!(f, "unix:{}", p.display()),
            Address::Tcp(hp) => write!(f, "tcp:{}", hp),
        }
    }
}

/// Any byte stream a connection can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub type BoxedStream = Box<dyn AsyncStream>;

/// Read half of a connection.
pub struct ConnectionReader {
    inner: FramedRead<ReadHalf<BoxedStream>, McpCodec>,
}

impl ConnectionReader {
    /// Next JSON value, or `None` at end of stream.
    pub async fn read_one(&mut self) -> Result<Option<Value>, TransportError> {
        match self.inner.next().await {
            Some(Ok(val)) => Ok(Some(val)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub async fn read_request(&mut self) -> Result<Option<JsonRpcRequest>, TransportError> {
        match self.read_one().await? {
            Some(val) => codec::decode_request(val)
                .map(Some)
                .map_err(TransportError::InvalidEnvelope),
            None => Ok(None),
        }
    }

    pub async fn read_response(&mut self) -> Result<Option<JsonRpcResponse>, TransportError> {
        match self.read_one().await? {
            Some(val) => codec::decode_response(val)
                .map(Some)
                .map_err(TransportError::InvalidEnvelope),
            None => Ok(None),
        }
    }
}

/// Write half of a connection.
pub struct ConnectionWriter {
    inner: FramedWrite<WriteHalf<BoxedStream>, McpCodec>,
    closed: bool,
}

impl ConnectionWriter {
    pub async fn write_one<T: Serialize + ?Sized>(
        &mut self,
        msg: &T,
    ) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inner.send(msg).await?;
        Ok(())
    }

    /// Flush and shut down the write side. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        <FramedWrite<WriteHalf<BoxedStream>, McpCodec> as SinkExt<&Value>>::close(&mut self.inner)
            .await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A duplex connection carrying one JSON value per read/write.
pub struct Connection {
    reader: ConnectionReader,
    writer: ConnectionWriter,
    peer: String,
}

impl Connection {
    /// Client side: open a connection to `address`.
    pub async fn dial(address: &Address) -> Result<Self, TransportError> {
        debug!("Dialing {}", address);
        match address {
            Address::Tcp(hostport) => {
                let stream = TcpStream::connect(hostport.as_str()).await?;
                stream.set_nodelay(true)?;
                Ok(Self::from_stream(stream, address.to_string()))
            }
            #[cfg(unix)]
            Address::Unix(path) => {
                let stream = UnixStream::connect(path).await?;
                Ok(Self::from_stream(stream, address.to_string()))
            }
            #[cfg(not(unix))]
            Address::Unix(_) => Err(TransportError::UnsupportedPlatform),
        }
    }

    /// Wrap an already-open stream.
    pub fn from_stream<S: AsyncStream + 'static>(stream: S, peer: impl Into<String>) -> Self {
        let boxed: BoxedStream = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        Self {
            reader: ConnectionReader {
                inner: FramedRead::new(read_half, McpCodec::new()),
            },
            writer: ConnectionWriter {
                inner: FramedWrite::new(write_half, McpCodec::new()),
                closed: false,
            },
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub async fn read_one(&mut self) -> Result<Option<Value>, TransportError> {
        if self.writer.is_closed() {
            return Ok(None);
        }
        self.reader.read_one().await
    }

    pub async fn read_request(&mut self) -> Result<Option<JsonRpcRequest>, TransportError> {
        if self.writer.is_closed() {
            return Ok(None);
        }
        self.reader.read_request().await
    }

    pub async fn write_one<T: Serialize + ?Sized>(
        &mut self,
        msg: &T,
    ) -> Result<(), TransportError> {
        self.writer.write_one(msg).await
    }

    /// Idempotent. Later reads on this connection report end of stream.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.writer.close().await
    }

    pub fn split(self) -> (ConnectionReader, ConnectionWriter) {
        (self.reader, self.writer)
    }
}

/// Server-side listener on either transport.
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl Listener {
    pub async fn bind(address: &Address) -> Result<Self, TransportError> {
        match address {
            Address::Tcp(hostport) => {
                Ok(Listener::Tcp(TcpListener::bind(hostport.as_str()).await?))
            }
            #[cfg(unix)]
            Address::Unix(path) => {
                // A socket file left by a previous run blocks bind.
                match std::fs::remove_file(path) {
                    Ok(()) => debug!("Removed stale socket {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                let listener = UnixListener::bind(path)?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            #[cfg(not(unix))]
            Address::Unix(_) => Err(TransportError::UnsupportedPlatform),
        }
    }

    pub async fn accept(&self) -> Result<Connection, TransportError> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok(Connection::from_stream(stream, peer.to_string()))
            }
            #[cfg(unix)]
            Listener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                Ok(Connection::from_stream(stream, format!("unix:{}", path.display())))
            }
        }
    }

    /// Bound address; resolves port 0 to the port actually assigned.
    pub fn local_address(&self) -> Result<Address, TransportError> {
        match self {
            Listener::Tcp(listener) => Ok(Address::Tcp(listener.local_addr()?.to_string())),
            #[cfg(unix)]
            Listener::Unix { path, .. } => Ok(Address::Unix(path.clone())),
        }
    }

    /// Remove the socket file, if any.
    pub fn cleanup(&self) {
        match self {
            Listener::Tcp(_) => {}
            #[cfg(unix)]
            Listener::Unix { path, .. } => {
                if let Err(e) = std::fs::remove_file(path) {
                    debug!("Socket cleanup for {} skipped: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        assert_eq!(
            "unix:/tmp/a.sock".parse::<Address>().unwrap(),
            Address::Unix(PathBuf::from("/tmp/a.sock"))
        );
        assert_eq!(
            "/tmp/b.sock".parse::<Address>().unwrap(),
            Address::Unix(PathBuf::from("/tmp/b.sock"))
        );
        assert_eq!(
            "127.0.0.1:8080".parse::<Address>().unwrap(),
            Address::Tcp("127.0.0.1:8080".into())
        );
        assert_eq!(
            "tcp:localhost:0".parse::<Address>().unwrap(),
            Address::Tcp("localhost:0".into())
        );
        assert!("localhost".parse::<Address>().is_err());
        assert!("host:notaport".parse::<Address>().is_err());
        assert!("unix:".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_display_parses_back() {
        for raw in ["unix:/run/mcp.sock", "tcp:127.0.0.1:9000"] {
            let addr: Address = raw.parse().unwrap();
            assert_eq!(addr.to_string(), raw);
        }
    }

    #[tokio::test]
    async fn test_connection_over_duplex_pipe() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = Connection::from_stream(a, "left");
        let mut right = Connection::from_stream(b, "right");

        let req = JsonRpcRequest::new(1u64, "tools/list", None);
        left.write_one(&req).await.unwrap();
        let got = right.read_request().await.unwrap().unwrap();
        assert_eq!(got, req);

        left.close().await.unwrap();
        left.close().await.unwrap();
        assert!(right.read_one().await.unwrap().is_none());
        assert!(left.read_one().await.unwrap().is_none());
    }
}
