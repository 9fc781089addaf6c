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

//! Handshake Manager (Protocol Negotiation).
//!
//! Picks the protocol version for an `initialize` exchange and builds the
//! handshake payloads for both sides. The negotiated version is reported
//! but never enforced on later calls.

use crate::core::constants::protocol;
use crate::protocol::types::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, ServerCapabilities,
    ServerInfo,
};
use tracing::{debug, info};

pub struct HandshakeManager;

impl HandshakeManager {
    /// Negotiate the protocol version requested by the client.
    pub fn negotiate(client_version: &str) -> &'static str {
        if let Some(v) = protocol::SUPPORTED_VERSIONS
            .iter()
            .find(|v| **v == client_version)
        {
            debug!("Client requested supported version {}", v);
            return v;
        }
        info!(
            "Unknown version '{}', answering with {}",
            client_version,
            protocol::LATEST_VERSION
        );
        protocol::LATEST_VERSION
    }

    /// Server side: answer an `initialize` request.
    pub fn accept(
        params: &InitializeParams,
        server_info: &ServerInfo,
        capabilities: ServerCapabilities,
    ) -> InitializeResult {
        info!(
            "Handshake from {} {} (protocol '{}')",
            params.client_info.name, params.client_info.version, params.protocol_version
        );
        InitializeResult {
            protocol_version: Self::negotiate(&params.protocol_version).to_string(),
            capabilities,
            server_info: server_info.clone(),
        }
    }

    /// Client side: params for an `initialize` request.
    pub fn offer(client_name: &str, client_version: &str) -> InitializeParams {
        InitializeParams {
            protocol_version: protocol::LATEST_VERSION.to_string(),
            capabilities: ClientCapabilities {
                roots: true,
                sampling: false,
            },
            client_info: ClientInfo {
                name: client_name.to_string(),
                version: client_version.to_string(),
            },
        }
    }
}
