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

//! Registry adapters.
//!
//! Map typed RPC params onto registry calls and the registry answers back
//! onto RPC results. Every collaborator failure becomes a `-32602` error with
//! the underlying message kept as text.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::resources::is_text_mime;
use super::{ResourceRegistry, ToolRegistry};
use crate::core::constants::{jsonrpc, messages};
use crate::core::models::JsonRpcError;
use crate::protocol::types::{
    CallToolParams, CallToolResult, ListResourcesResult, ListToolsResult, ReadResourceParams,
    ReadResourceResult, ResourceContents,
};

fn to_result<T: Serialize>(payload: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(payload).map_err(|e| {
        JsonRpcError::new(
            jsonrpc::ERROR_INTERNAL,
            format!("Failed to serialize result: {}", e),
        )
    })
}

pub fn list_tools(tools: &dyn ToolRegistry) -> Result<Value, JsonRpcError> {
    to_result(&ListToolsResult { tools: tools.list() })
}

pub fn call_tool(tools: &dyn ToolRegistry, params: &CallToolParams) -> Result<Value, JsonRpcError> {
    debug!("Calling tool {}", params.name);
    match tools.execute(&params.name, &params.arguments) {
        Ok(text) => to_result(&CallToolResult::text(text)),
        Err(e) => {
            warn!("Tool {} failed: {}", params.name, e);
            Err(JsonRpcError::invalid_params(format!(
                "Tool execution failed: {}",
                e
            )))
        }
    }
}

pub fn list_resources(resources: &dyn ResourceRegistry) -> Result<Value, JsonRpcError> {
    to_result(&ListResourcesResult {
        resources: resources.list(),
    })
}

pub fn read_resource(
    resources: &dyn ResourceRegistry,
    params: &ReadResourceParams,
) -> Result<Value, JsonRpcError> {
    let Some(resource) = resources.get(&params.uri) else {
        return Err(JsonRpcError::invalid_params(messages::RESOURCE_NOT_FOUND));
    };

    if !is_text_mime(&resource.mime_type) {
        return Err(JsonRpcError::invalid_params(messages::UNSUPPORTED_RESOURCE));
    }

    let bytes = resources.read_bytes(&resource.uri).map_err(|e| {
        warn!("Reading {} failed: {}", resource.uri, e);
        JsonRpcError::invalid_params(format!("Failed to read resource: {}", e))
    })?;
    let text = String::from_utf8(bytes).map_err(|_| {
        JsonRpcError::invalid_params(format!(
            "Failed to read resource: {} is not valid UTF-8",
            resource.uri
        ))
    })?;

    to_result(&ReadResourceResult {
        contents: vec![ResourceContents {
            uri: resource.uri,
            mime_type: resource.mime_type,
            text,
        }],
    })
}
