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

//! MCP Transport Codec.
//!
//! Frames JSON-RPC messages on a byte stream that carries a plain sequence of
//! self-delimiting JSON values: no length prefix, no required delimiter.
//! The encoder writes compact JSON followed by a newline; the decoder accepts
//! any (or no) whitespace between values.

use crate::core::constants::limits;
use crate::core::errors::CodecError;
use crate::core::models::{JsonRpcRequest, JsonRpcResponse};
use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Decoder state carries over between calls, so a value that arrives in
/// many reads is scanned once rather than re-parsed from its first byte on
/// every read.
#[derive(Debug, Default, Clone)]
pub struct McpCodec {
    scan: Scan,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Shape {
    #[default]
    Unstarted,
    /// Object or array.
    Nested,
    /// Top-level string.
    Text,
    /// Number, `true`, `false` or `null`.
    Scalar,
}

/// Progress through the value at the front of the buffer.
#[derive(Debug, Default, Clone, Copy)]
struct Scan {
    offset: usize,
    shape: Shape,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scan {
    /// Resume from `offset`. Returns the end of the value once it is complete.
    fn advance(&mut self, src: &[u8], at_eof: bool) -> Option<usize> {
        if self.shape == Shape::Unstarted {
            self.shape = match src[0] {
                b'{' | b'[' => Shape::Nested,
                b'"' => Shape::Text,
                _ => Shape::Scalar,
            };
            match self.shape {
                Shape::Nested => {
                    self.depth = 1;
                    self.offset = 1;
                }
                Shape::Text => {
                    self.in_string = true;
                    self.offset = 1;
                }
                _ => {}
            }
        }

        while self.offset < src.len() {
            let b = src[self.offset];
            if self.shape == Shape::Scalar {
                if b.is_ascii_whitespace() || b"{}[],:\"".contains(&b) {
                    return Some(self.offset);
                }
                self.offset += 1;
                continue;
            }

            self.offset += 1;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return Some(self.offset);
                    }
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(self.offset);
                    }
                }
                _ => {}
            }
        }

        // A bare scalar that runs to the end of the buffer may still be
        // growing (`12` then `3`); it ends only at a delimiter or EOF.
        (self.shape == Shape::Scalar && at_eof).then_some(src.len())
    }
}

impl McpCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_value(
        &mut self,
        src: &mut BytesMut,
        at_eof: bool,
    ) -> Result<Option<Value>, CodecError> {
        if self.scan.offset > src.len() {
            // Stale state from a different buffer.
            self.scan = Scan::default();
        }
        if self.scan.shape == Shape::Unstarted {
            let skip = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
            src.advance(skip);
            if src.is_empty() {
                return Ok(None);
            }
        }

        let Some(end) = self.scan.advance(&src[..], at_eof) else {
            if src.len() > limits::MAX_MESSAGE_SIZE_BYTES {
                self.scan = Scan::default();
                return Err(CodecError::TooLarge(src.len()));
            }
            trace!("Incomplete value, {} bytes buffered", src.len());
            return Ok(None);
        };

        self.scan = Scan::default();
        let val = serde_json::from_slice::<Value>(&src[..end])
            .map_err(|e| CodecError::Malformed(e.to_string()))?;
        src.advance(end);
        trace!("Decoded message: {:?}", val);
        Ok(Some(val))
    }
}

impl Decoder for McpCodec {
    type Item = Value;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode_value(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode_value(src, true)? {
            Some(val) => Ok(Some(val)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::Truncated(src.len())),
        }
    }
}

impl<'a, T> Encoder<&'a T> for McpCodec
where
    T: Serialize + ?Sized,
{
    type Error = CodecError;

    fn encode(&mut self, item: &'a T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut writer = dst.writer();
        serde_json::to_writer(&mut writer, item).map_err(CodecError::Serialize)?;
        let dst = writer.into_inner();
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Interpret a decoded value as a request envelope.
pub fn decode_request(val: Value) -> Result<JsonRpcRequest, serde_json::Error> {
    serde_json::from_value(val)
}

/// Interpret a decoded value as a response envelope.
pub fn decode_response(val: Value) -> Result<JsonRpcResponse, serde_json::Error> {
    serde_json::from_value(val)
}
