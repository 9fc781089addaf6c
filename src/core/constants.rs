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

//! mcp-link Constants - Single source of truth for protocol values and limits.
//!
//! Error codes, method names and environment variable names used across
//! the codec, router and correlator.

/// JSON-RPC 2.0 Error Codes
pub mod jsonrpc {
    /// Protocol tag carried by every envelope
    pub const VERSION: &str = "2.0";
    /// Method not found (standard JSON-RPC)
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params, also used for tool and resource failures
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    /// Internal error (standard JSON-RPC)
    pub const ERROR_INTERNAL: i32 = -32603;
}

/// MCP Protocol Methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
}

/// Handshake values
pub mod protocol {
    /// Protocol version this server speaks
    pub const LATEST_VERSION: &str = "2024-11-05";
    /// Every version the negotiator accepts verbatim
    pub const SUPPORTED_VERSIONS: &[&str] = &["2024-11-05"];
}

/// Human-readable error messages put on the wire
pub mod messages {
    pub const METHOD_NOT_FOUND: &str = "Method not found";
    pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
    pub const UNSUPPORTED_RESOURCE: &str = "Unsupported resource type";
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_ADDRESS: &str = "MCP_LINK_ADDRESS";
    pub const ENV_TCP_ADDRESS: &str = "MCP_LINK_TCP_ADDRESS";
    pub const ENV_TIMEOUT_SECS: &str = "MCP_LINK_TIMEOUT_SECS";
    pub const ENV_SHUTDOWN_GRACE_SECS: &str = "MCP_LINK_SHUTDOWN_GRACE_SECS";
    pub const ENV_SERVER_NAME: &str = "MCP_LINK_SERVER_NAME";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Timing defaults
pub mod timing {
    use std::time::Duration;

    /// Per-call wait before the correlator gives up
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// How long shutdown waits for in-flight connections
    pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
}

/// Transport Limits (DoS Protection)
pub mod limits {
    /// Maximum allowed JSON-RPC message size (10 MB)
    pub const MAX_MESSAGE_SIZE_BYTES: usize = 10 * 1024 * 1024;
}
