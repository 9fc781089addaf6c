// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_link::core::models::JsonRpcRequest;
use mcp_link::mcp::McpServer;
use mcp_link::registry::{EchoTool, StaticToolRegistry};
use std::sync::{Arc, OnceLock};

static SERVER: OnceLock<McpServer> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    // Whatever request decodes, dispatch answers it without panicking and
    // echoes its id.
    let server = SERVER.get_or_init(|| {
        let tools = StaticToolRegistry::new().with_tool(EchoTool::default());
        McpServer::new("fuzz", "0.0.0", Arc::new(tools))
    });

    if let Ok(req) = serde_json::from_slice::<JsonRpcRequest>(data) {
        let id = req.id.clone();
        match server.dispatch(req) {
            Some(resp) => assert_eq!(resp.id, id),
            None => assert!(id.is_none()),
        }
    }
});
