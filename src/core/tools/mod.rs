//! Local handlers for AI-issued function calls.
//!
//! The AI leg asks for a tool by name with a JSON argument object; the
//! [`ToolDispatcher`] routes the request to a [`ToolHandler`] and always
//! produces exactly one [`ToolResult`], turning failures into
//! `{"error": "<message>"}` payloads.

mod customer;
mod dispatcher;
mod end_call;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

pub use customer::{CUSTOMER_INFO_TOOL, CustomerInfoTool, CustomerProfile};
pub use dispatcher::ToolDispatcher;
pub use end_call::{END_CALL_TOOL, EndCallTool};

/// Function declaration advertised to the AI provider at session setup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema-like parameter object
    pub parameters: Value,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned id that the result must echo
    pub id: String,
    pub name: String,
    pub args: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Reply to a [`ToolInvocation`], keyed by the invocation id.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub response: Value,
}

impl ToolResult {
    pub fn success(invocation: &ToolInvocation, response: Value) -> Self {
        Self {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            response,
        }
    }

    pub fn failure(invocation: &ToolInvocation, message: impl Into<String>) -> Self {
        Self {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            response: json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }
}

/// Per-call context handed to tool handlers.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Call id of the session the invocation came from
    pub call_id: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// A single callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    fn declaration(&self) -> FunctionDefinition;

    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<Value, ToolError>;
}
