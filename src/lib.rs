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

//! mcp-link: JSON-RPC 2.0 transport for the Model Context Protocol.
//!
//! Carries MCP envelopes over Unix domain sockets or TCP in both
//! directions. `mcp::McpServer` accepts connections and routes requests to
//! tool and resource registries; `mcp::McpClient` issues calls over one
//! connection and correlates the responses.

pub mod config;
pub mod core;
pub mod mcp;
pub mod protocol;
pub mod registry;

pub use crate::core::errors::{ClientError, CodecError, TransportError};
pub use crate::mcp::{Address, McpClient, McpServer};
