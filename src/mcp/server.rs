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

//! MCP Server Router.
//!
//! Owns the listeners, spawns one task per accepted connection and answers
//! each decoded request with exactly one response before reading the next.
//! Decode failures and end of stream close the connection without a reply;
//! they never affect other connections.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{oneshot, watch, Notify};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::core::errors::TransportError;
use crate::core::models::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::transport::{Address, Connection, Listener};
use crate::protocol::methods::{Method, RequestParams};
use crate::protocol::negotiation::HandshakeManager;
use crate::protocol::types::{ServerCapabilities, ServerInfo};
use crate::registry::{adapters, ResourceTable, ToolRegistry};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Stateless request dispatcher shared by every connection task.
pub struct Router {
    info: ServerInfo,
    capabilities: ServerCapabilities,
    tools: Arc<dyn ToolRegistry>,
    resources: Arc<ResourceTable>,
}

impl Router {
    /// Handle one request. Notifications (no id) are executed but get no reply.
    pub fn dispatch(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest { id, method, params, .. } = req;
        debug!("Dispatching {} (id: {:?})", method, id);

        let outcome = match Method::parse(&method) {
            Some(m) => match RequestParams::decode(m, params) {
                Ok(typed) => self.route(typed),
                Err(e) => {
                    warn!("Invalid params for {}: {}", method, e);
                    Err(JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
                }
            },
            None => {
                debug!("Unknown method {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        if id.is_none() {
            debug!("Notification {} handled, no response sent", method);
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn route(&self, params: RequestParams) -> Result<serde_json::Value, JsonRpcError> {
        match params {
            RequestParams::Initialize(p) => {
                let result = HandshakeManager::accept(&p, &self.info, self.capabilities);
                serde_json::to_value(result).map_err(|e| {
                    JsonRpcError::new(
                        crate::core::constants::jsonrpc::ERROR_INTERNAL,
                        e.to_string(),
                    )
                })
            }
            RequestParams::ToolsList => adapters::list_tools(self.tools.as_ref()),
            RequestParams::ToolsCall(p) => adapters::call_tool(self.tools.as_ref(), &p),
            RequestParams::ResourcesList => adapters::list_resources(self.resources.as_ref()),
            RequestParams::ResourcesRead(p) => {
                adapters::read_resource(self.resources.as_ref(), &p)
            }
        }
    }
}

/// Live connection tasks, keyed by a per-server sequence number.
#[derive(Default)]
struct ConnectionSet {
    tasks: Mutex<HashMap<u64, AbortHandle>>,
    drained: Notify,
    next_id: AtomicU64,
}

impl ConnectionSet {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish(&self, id: u64) {
        let mut tasks = self.lock();
        tasks.remove(&id);
        if tasks.is_empty() {
            self.drained.notify_one();
        }
    }
}

struct ListenerTask {
    address: Address,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Handle to a router and its listeners. Clones share state; dropping the
/// last clone stops the accept loops and closes idle connections.
#[derive(Clone)]
pub struct McpServer {
    router: Arc<Router>,
    connections: Arc<ConnectionSet>,
    runtime: Arc<ServerRuntime>,
}

struct ServerRuntime {
    listeners: Mutex<Vec<ListenerTask>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl McpServer {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        tools: Arc<dyn ToolRegistry>,
    ) -> Self {
        Self::with_resources(name, version, tools, Arc::new(ResourceTable::new()))
    }

    pub fn with_resources(
        name: impl Into<String>,
        version: impl Into<String>,
        tools: Arc<dyn ToolRegistry>,
        resources: Arc<ResourceTable>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            router: Arc::new(Router {
                info: ServerInfo {
                    name: name.into(),
                    version: version.into(),
                },
                capabilities: ServerCapabilities {
                    tools: true,
                    resources: true,
                    prompts: false,
                },
                tools,
                resources,
            }),
            connections: Arc::new(ConnectionSet::default()),
            runtime: Arc::new(ServerRuntime {
                listeners: Mutex::new(Vec::new()),
                shutdown_tx,
                shutdown_rx,
            }),
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.router.info
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        self.router.capabilities
    }

    pub fn resources(&self) -> Arc<ResourceTable> {
        Arc::clone(&self.router.resources)
    }

    pub fn register_resource(
        &self,
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) {
        self.router
            .resources
            .register(uri, name, description, mime_type, metadata);
    }

    pub fn dispatch(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.router.dispatch(req)
    }

    pub fn active_connections(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn listening(&self) -> Vec<Address> {
        self.listeners().iter().map(|l| l.address.clone()).collect()
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<ListenerTask>> {
        self.runtime
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Bind `address` and start accepting in the background. May be called
    /// repeatedly to serve several addresses at once. Returns the bound
    /// address (TCP port 0 resolved).
    pub async fn listen(&self, address: &Address) -> Result<Address, TransportError> {
        let listener = Listener::bind(address).await?;
        let bound = listener.local_address()?;
        info!("MCP server {} listening on {}", self.router.info.name, bound);

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.router),
            Arc::clone(&self.connections),
            self.runtime.shutdown_rx.clone(),
            stop_rx,
        ));

        self.listeners().push(ListenerTask {
            address: bound.clone(),
            stop_tx,
            task,
        });
        Ok(bound)
    }

    /// Stop accepting, ask open connections to finish, and abort whatever is
    /// still running once `grace` has elapsed.
    pub async fn shutdown(&self, grace: Duration) {
        let listeners: Vec<ListenerTask> = self.listeners().drain(..).collect();
        for l in listeners {
            let _ = l.stop_tx.send(());
            if let Err(e) = l.task.await {
                warn!("Accept loop for {} ended abnormally: {}", l.address, e);
            }
        }

        let _ = self.runtime.shutdown_tx.send(true);

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let remaining = self.active_connections();
            if remaining == 0 {
                info!("All connections drained");
                return;
            }
            if tokio::time::timeout_at(deadline, self.connections.drained.notified())
                .await
                .is_err()
            {
                break;
            }
        }

        let tasks: Vec<(u64, AbortHandle)> = self.connections.lock().drain().collect();
        warn!("Grace period over, aborting {} connection(s)", tasks.len());
        for (_, handle) in tasks {
            handle.abort();
        }
    }
}

async fn accept_loop(
    listener: Listener,
    router: Arc<Router>,
    connections: Arc<ConnectionSet>,
    shutdown_rx: watch::Receiver<bool>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                info!("Listener stopping");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => spawn_connection(conn, &router, &connections, shutdown_rx.clone()),
                Err(e) => {
                    error!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
    listener.cleanup();
}

fn spawn_connection(
    conn: Connection,
    router: &Arc<Router>,
    connections: &Arc<ConnectionSet>,
    shutdown_rx: watch::Receiver<bool>,
) {
    let id = connections.next_id.fetch_add(1, Ordering::Relaxed);
    debug!("Connection {} from {}", id, conn.peer());

    // Registration happens under the lock so the task cannot deregister first.
    let mut tasks = connections.lock();
    let router = Arc::clone(router);
    let set = Arc::clone(connections);
    let handle = tokio::spawn(async move {
        serve_connection(conn, &router, shutdown_rx).await;
        set.finish(id);
        debug!("Connection {} finished", id);
    });
    tasks.insert(id, handle.abort_handle());
}

/// Per-connection loop: OPEN until end of stream, a decode failure, a write
/// failure or server shutdown; then CLOSED.
async fn serve_connection(
    mut conn: Connection,
    router: &Router,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let request = tokio::select! {
            read = conn.read_request() => match read {
                Ok(Some(req)) => req,
                Ok(None) => {
                    debug!("Peer {} closed the connection", conn.peer());
                    break;
                }
                Err(e) => {
                    warn!("Dropping connection {}: {}", conn.peer(), e);
                    break;
                }
            },
            _ = shutdown_rx.changed() => {
                debug!("Shutdown signalled, closing {}", conn.peer());
                break;
            }
        };

        if let Some(response) = router.dispatch(request) {
            if let Err(e) = conn.write_one(&response).await {
                warn!("Failed to write response to {}: {}", conn.peer(), e);
                break;
            }
        }
    }

    if let Err(e) = conn.close().await {
        debug!("Close of {} failed: {}", conn.peer(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RequestId;
    use crate::registry::{EchoTool, StaticToolRegistry};
    use serde_json::json;

    fn server() -> McpServer {
        let tools = StaticToolRegistry::new().with_tool(EchoTool::new("x"));
        McpServer::new("test-server", "1.2.3", Arc::new(tools))
    }

    fn request(id: u64, method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    #[test]
    fn test_unknown_method() {
        let resp = server().dispatch(request(9, "prompts/list", None)).unwrap();
        assert_eq!(resp.id, Some(RequestId::Int(9)));
        assert_eq!(resp.error().unwrap().code, -32601);
        assert_eq!(resp.error().unwrap().message, "Method not found");
    }

    #[test]
    fn test_initialize_reports_identity_and_capabilities() {
        let resp = server()
            .dispatch(request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"roots": true, "sampling": false},
                    "clientInfo": {"name": "test", "version": "0.1.0"}
                })),
            ))
            .unwrap();
        assert_eq!(
            resp.result().unwrap(),
            &json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": true, "resources": true, "prompts": false},
                "serverInfo": {"name": "test-server", "version": "1.2.3"}
            })
        );
    }

    #[test]
    fn test_tools_call_missing_params_is_invalid() {
        let resp = server().dispatch(request(2, "tools/call", None)).unwrap();
        assert_eq!(resp.error().unwrap().code, -32602);
    }

    #[test]
    fn test_notification_gets_no_response() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: None,
            method: "tools/list".into(),
            params: None,
        };
        assert!(server().dispatch(req).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_with_no_connections_returns_promptly() {
        let srv = server();
        let addr = srv
            .listen(&Address::Tcp("127.0.0.1:0".into()))
            .await
            .unwrap();
        assert_eq!(srv.listening(), vec![addr]);
        srv.shutdown(Duration::from_secs(1)).await;
        assert!(srv.listening().is_empty());
        assert_eq!(srv.active_connections(), 0);
    }
}
