// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mcp_link::mcp::codec::{decode_request, decode_response};
use mcp_link::mcp::McpCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Any byte stream must yield values, a clean stall, or an error. Never a panic.
    let mut codec = McpCodec::new();
    let mut buffer = BytesMut::from(data);

    while let Ok(Some(val)) = codec.decode(&mut buffer) {
        let _ = decode_request(val.clone());
        let _ = decode_response(val);
    }
    let _ = codec.decode_eof(&mut buffer);
});
