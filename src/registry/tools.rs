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

//! In-process tool registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::ToolRegistry;
use crate::core::errors::ToolError;
use crate::protocol::types::ToolDescriptor;

/// A single named operation.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the `arguments` object
    fn input_schema(&self) -> Value;
    fn execute(&self, args: &Map<String, Value>) -> Result<String, ToolError>;
}

/// Tools keyed by name. Later registrations replace earlier ones.
#[derive(Default, Clone)]
pub struct StaticToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl StaticToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for StaticToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    fn execute(&self, name: &str, args: &Map<String, Value>) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(args)
    }
}

/// Returns one string argument unchanged.
#[derive(Debug, Clone)]
pub struct EchoTool {
    argument: String,
}

impl EchoTool {
    pub fn new(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new("text")
    }
}

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the given text back"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                (self.argument.as_str()): {
                    "type": "string",
                    "description": "Text to echo"
                }
            },
            "required": [self.argument]
        })
    }

    fn execute(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        match args.get(&self.argument) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ToolError::InvalidArguments(format!(
                "{} must be a string",
                self.argument
            ))),
            None => Err(ToolError::InvalidArguments(format!(
                "{} is required",
                self.argument
            ))),
        }
    }
}

type ToolFn = dyn Fn(&Map<String, Value>) -> Result<String, ToolError> + Send + Sync;

/// Tool backed by a closure.
pub struct FnTool {
    name: String,
    description: String,
    input_schema: Value,
    func: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({ "type": "object" }),
            func: Box::new(func),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    fn execute(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        (self.func)(args)
    }
}
