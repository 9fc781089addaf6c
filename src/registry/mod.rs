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

//! Registry collaborators.
//!
//! The transport never looks inside tools or resources. It talks to them
//! through the two traits defined here and maps their results onto RPC
//! payloads in `adapters`.

pub mod adapters;
pub mod resources;
pub mod tools;

use serde_json::{Map, Value};

use crate::core::errors::{ResourceError, ToolError};
use crate::protocol::types::{ResourceDescriptor, ToolDescriptor};

/// Source of tools for `tools/list` and `tools/call`.
///
/// Implementations must tolerate concurrent `execute` calls from several
/// connection tasks.
pub trait ToolRegistry: Send + Sync {
    fn list(&self) -> Vec<ToolDescriptor>;

    fn execute(&self, name: &str, args: &Map<String, Value>) -> Result<String, ToolError>;
}

/// Source of resources for `resources/list` and `resources/read`.
pub trait ResourceRegistry: Send + Sync {
    fn list(&self) -> Vec<ResourceDescriptor>;

    fn get(&self, uri: &str) -> Option<ResourceDescriptor>;

    /// Only invoked for text-like mime types.
    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>, ResourceError>;
}

pub use resources::{FileResourceReader, ResourceReader, ResourceTable};
pub use tools::{EchoTool, FnTool, StaticToolRegistry, Tool};
