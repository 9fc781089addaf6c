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

// Domain error types for the codec, the connection and the correlator.

use std::time::Duration;
use thiserror::Error;

/// Failures while framing JSON values out of the byte stream.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O Error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The next value in the stream is not valid JSON
    #[error("Malformed JSON value: {0}")]
    Malformed(String),

    /// The stream ended in the middle of a value
    #[error("Stream ended inside a JSON value ({0} bytes buffered)")]
    Truncated(usize),

    /// A single value grew past the message limit
    #[error("Message length {0} exceeds max limit")]
    TooLarge(usize),

    /// Outgoing message could not be serialized
    #[error("Failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Connection-level faults. Any of these ends the connection.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Value decoded fine but is not a JSON-RPC envelope
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("Connection closed")]
    Closed,

    #[error("Unix domain sockets are not supported on this platform")]
    UnsupportedPlatform,
}

/// Errors surfaced to callers of the client API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Local failure: no response arrived in time
    #[error("Request '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("Connection closed before a response arrived")]
    ConnectionClosed,

    /// Remote returned a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// JSON-RPC error code, if the failure came from the remote side.
    pub fn code(&self) -> Option<i32> {
        match self {
            ClientError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

/// Failure reported by a tool collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool {0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),
}

/// Failure reported by a resource collaborator.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("resource {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("resource {0} is not valid UTF-8")]
    NotText(String),
}

/// Bad configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] TransportError),
}
