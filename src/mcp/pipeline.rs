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

//! Client-side response pipeline.
//!
//! The pending-call table pairs outgoing request ids with single-use reply
//! slots, and one background task per connection drains the read half into
//! it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::errors::{ClientError, TransportError};
use crate::core::models::{JsonRpcResponse, RequestId};
use crate::mcp::transport::ConnectionReader;

#[derive(Default)]
struct PendingState {
    slots: HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>,
    closed: bool,
}

/// Outstanding calls on one connection.
///
/// Every removal is a check-and-delete under the same lock, so a slot is
/// taken by exactly one of: the reader (delivery), the caller (timeout or
/// cancellation) or `close`.
#[derive(Default)]
pub struct PendingCalls {
    state: Mutex<PendingState>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create the reply slot for `id`. Must happen before the request is sent.
    pub fn register(
        &self,
        id: RequestId,
    ) -> Result<oneshot::Receiver<JsonRpcResponse>, ClientError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        state.slots.insert(id, tx);
        Ok(rx)
    }

    /// Drop the slot for `id`. Returns whether this call removed it.
    pub fn remove(&self, id: &RequestId) -> bool {
        self.lock().slots.remove(id).is_some()
    }

    /// Route a response to its caller. Responses without an id, or whose
    /// caller has already given up, are discarded.
    pub fn deliver(&self, response: JsonRpcResponse) {
        let Some(id) = response.id.clone() else {
            warn!("Dropping response without id");
            return;
        };
        let slot = self.lock().slots.remove(&id);
        match slot {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!("Caller for {} went away before delivery", id);
                }
            }
            None => debug!("Discarding orphan response {}", id),
        }
    }

    /// Fail every waiter and refuse new registrations.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        if !state.slots.is_empty() {
            debug!("Failing {} pending call(s)", state.slots.len());
        }
        state.slots.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawns the background task that reads responses until the stream ends.
pub fn spawn_response_reader(
    mut reader: ConnectionReader,
    pending: Arc<PendingCalls>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match reader.read_response().await {
                Ok(Some(resp)) => pending.deliver(resp),
                Err(TransportError::InvalidEnvelope(e)) => {
                    warn!("Discarding message that is not a response: {}", e);
                }
                Ok(None) => {
                    debug!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    warn!("Response stream failed: {}", e);
                    break;
                }
            }
        }
        pending.close();
    })
}
