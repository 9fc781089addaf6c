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

//! Method table.
//!
//! The set of routable methods is closed: a name either maps to a `Method`
//! or the request is answered with "Method not found". Params are decoded
//! once, straight into the typed shape for that method.

use serde_json::Value;
use std::fmt;

use crate::core::constants::methods;
use crate::protocol::types::{CallToolParams, InitializeParams, ReadResourceParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Initialize,
        Method::ToolsList,
        Method::ToolsCall,
        Method::ResourcesList,
        Method::ResourcesRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Initialize => methods::INITIALIZE,
            Method::ToolsList => methods::TOOLS_LIST,
            Method::ToolsCall => methods::TOOLS_CALL,
            Method::ResourcesList => methods::RESOURCES_LIST,
            Method::ResourcesRead => methods::RESOURCES_READ,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Params of a request, keyed by its method.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestParams {
    Initialize(InitializeParams),
    ToolsList,
    ToolsCall(CallToolParams),
    ResourcesList,
    ResourcesRead(ReadResourceParams),
}

impl RequestParams {
    /// Single-pass typed decode of `params` for a known method.
    ///
    /// `initialize` and the list methods tolerate absent params; the call and
    /// read methods require them.
    pub fn decode(method: Method, params: Option<Value>) -> Result<Self, serde_json::Error> {
        Ok(match method {
            Method::Initialize => match params {
                None | Some(Value::Null) => RequestParams::Initialize(InitializeParams::default()),
                Some(v) => RequestParams::Initialize(serde_json::from_value(v)?),
            },
            Method::ToolsList => RequestParams::ToolsList,
            Method::ToolsCall => {
                RequestParams::ToolsCall(serde_json::from_value(params.unwrap_or(Value::Null))?)
            }
            Method::ResourcesList => RequestParams::ResourcesList,
            Method::ResourcesRead => {
                RequestParams::ResourcesRead(serde_json::from_value(params.unwrap_or(Value::Null))?)
            }
        })
    }

    pub fn method(&self) -> Method {
        match self {
            RequestParams::Initialize(_) => Method::Initialize,
            RequestParams::ToolsList => Method::ToolsList,
            RequestParams::ToolsCall(_) => Method::ToolsCall,
            RequestParams::ResourcesList => Method::ResourcesList,
            RequestParams::ResourcesRead(_) => Method::ResourcesRead,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_method_name_round_trips() {
        for m in Method::ALL {
            assert_eq!(Method::parse(m.as_str()), Some(m));
        }
        assert_eq!(Method::parse("prompts/list"), None);
        assert_eq!(Method::parse("Initialize"), None);
    }

    #[test]
    fn test_initialize_without_params_uses_defaults() {
        let p = RequestParams::decode(Method::Initialize, None).unwrap();
        assert_eq!(p, RequestParams::Initialize(InitializeParams::default()));
    }

    #[test]
    fn test_tools_call_requires_name() {
        assert!(RequestParams::decode(Method::ToolsCall, None).is_err());
        assert!(RequestParams::decode(Method::ToolsCall, Some(json!({"arguments": {}}))).is_err());

        let p = RequestParams::decode(Method::ToolsCall, Some(json!({"name": "echo"}))).unwrap();
        match p {
            RequestParams::ToolsCall(c) => {
                assert_eq!(c.name, "echo");
                assert!(c.arguments.is_empty());
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_list_methods_ignore_params() {
        let p = RequestParams::decode(Method::ResourcesList, Some(json!({"cursor": "x"}))).unwrap();
        assert_eq!(p.method(), Method::ResourcesList);
    }
}
