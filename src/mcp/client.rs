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

//! MCP Client Correlator.
//!
//! Turns the asynchronous response stream into a call-and-wait API. Many
//! tasks may call concurrently on one client: writes are serialized by a
//! send lock, replies are matched to callers by request id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::constants::{methods, timing};
use crate::core::errors::ClientError;
use crate::core::models::{JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::mcp::pipeline::{spawn_response_reader, PendingCalls};
use crate::mcp::transport::{Address, Connection, ConnectionWriter};
use crate::protocol::negotiation::HandshakeManager;
use crate::protocol::types::{
    CallToolParams, CallToolResult, InitializeResult, ListResourcesResult, ListToolsResult,
    ReadResourceParams, ReadResourceResult, ResourceDescriptor, ServerInfo, ToolDescriptor,
};

/// Removes the pending slot for a call however the call ends, including
/// when the caller's future is dropped.
struct SlotGuard<'a> {
    pending: &'a PendingCalls,
    id: RequestId,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

pub struct McpClient {
    address: Address,
    writer: AsyncMutex<ConnectionWriter>,
    pending: Arc<PendingCalls>,
    reader_task: JoinHandle<()>,
    next_id: AtomicU64,
    timeout: Duration,
    server: Mutex<Option<InitializeResult>>,
}

impl McpClient {
    /// Dial `address` and start the background reader.
    pub async fn connect(address: &Address) -> Result<Self, ClientError> {
        let conn = Connection::dial(address).await?;
        info!("Connected to {}", address);
        let (reader, writer) = conn.split();
        let pending = Arc::new(PendingCalls::new());
        let reader_task = spawn_response_reader(reader, Arc::clone(&pending));

        Ok(Self {
            address: address.clone(),
            writer: AsyncMutex::new(writer),
            pending,
            reader_task,
            next_id: AtomicU64::new(0),
            timeout: timing::DEFAULT_REQUEST_TIMEOUT,
            server: Mutex::new(None),
        })
    }

    /// Default per-call timeout for `call` and the typed helpers.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Calls still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_connected(&self) -> bool {
        !self.pending.is_closed()
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::from(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Send one request and wait for its response envelope. `timeout` bounds
    /// the whole call: waiting for the send lock, the write and the reply.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError> {
        let deadline = Instant::now() + timeout;
        let id = self.next_request_id();
        let mut rx = self.pending.register(id.clone())?;
        let guard = SlotGuard {
            pending: &self.pending,
            id: id.clone(),
        };
        let timed_out = || {
            warn!("Request {} (id {}) timed out after {:?}", method, id, timeout);
            ClientError::Timeout {
                method: method.to_string(),
                after: timeout,
            }
        };

        let request = JsonRpcRequest::new(id.clone(), method, params);
        debug!("Sending {} (id {})", method, id);
        let sent = tokio::time::timeout_at(deadline, async {
            let mut writer = self.writer.lock().await;
            writer.write_one(&request).await
        })
        .await;
        match sent {
            Ok(written) => written?,
            // Dropping the guard frees the slot.
            Err(_) => return Err(timed_out()),
        }

        match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                if guard.pending.remove(&guard.id) {
                    return Err(timed_out());
                }
                // The reader took the slot first; its send is already under way.
                rx.await.map_err(|_| ClientError::ConnectionClosed)
            }
        }
    }

    /// Call `method` and return its `result`, using the client's timeout.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        self.call_with_timeout(method, params, self.timeout).await
    }

    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        self.request(method, params, timeout)
            .await?
            .into_result()
            .map_err(|e| ClientError::Rpc {
                code: e.code,
                message: e.message,
            })
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::UnexpectedResponse(format!("{}: {}", method, e)))
    }

    /// Run the handshake and remember the server's answer. Optional: other
    /// calls work without it.
    pub async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> Result<InitializeResult, ClientError> {
        let params = serde_json::to_value(HandshakeManager::offer(client_name, client_version))?;
        let result: InitializeResult = self.call_typed(methods::INITIALIZE, Some(params)).await?;
        info!(
            "Server {} {} speaks {}",
            result.server_info.name, result.server_info.version, result.protocol_version
        );
        *self.server.lock().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
        Ok(result)
    }

    /// Server identity from the last successful `initialize`.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|r| r.server_info.clone())
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let result: ListToolsResult = self.call_typed(methods::TOOLS_LIST, None).await?;
        Ok(result.tools)
    }

    /// Invoke a tool and return its first text block.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ClientError> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })?;
        let result: CallToolResult = self.call_typed(methods::TOOLS_CALL, Some(params)).await?;
        result
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ClientError::UnexpectedResponse("unexpected response format".into()))
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, ClientError> {
        let result: ListResourcesResult = self.call_typed(methods::RESOURCES_LIST, None).await?;
        Ok(result.resources)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, ClientError> {
        let params = serde_json::to_value(ReadResourceParams {
            uri: uri.to_string(),
        })?;
        self.call_typed(methods::RESOURCES_READ, Some(params)).await
    }

    /// Drop the current connection and dial the same address again. Calls in
    /// flight on the old connection fail with `ConnectionClosed`; request ids
    /// keep counting up.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.shutdown_connection().await;
        let conn = Connection::dial(&self.address).await?;
        let (reader, writer) = conn.split();
        let pending = Arc::new(PendingCalls::new());
        self.reader_task = spawn_response_reader(reader, Arc::clone(&pending));
        self.pending = pending;
        self.writer = AsyncMutex::new(writer);
        info!("Reconnected to {}", self.address);
        Ok(())
    }

    async fn shutdown_connection(&self) {
        // Flushing can stall on a peer that stopped reading.
        let closed = tokio::time::timeout(self.timeout, async {
            self.writer.lock().await.close().await
        })
        .await;
        match closed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Closing writer failed: {}", e),
            Err(_) => debug!("Closing writer timed out after {:?}", self.timeout),
        }
        self.reader_task.abort();
        self.pending.close();
    }

    /// Close the connection. Idempotent; waiting callers get `ConnectionClosed`.
    pub async fn close(&self) {
        self.shutdown_connection().await;
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
