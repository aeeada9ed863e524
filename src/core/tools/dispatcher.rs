use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::{FunctionDefinition, ToolContext, ToolError, ToolHandler, ToolInvocation, ToolResult};

/// Name-indexed registry of tool handlers.
#[derive(Default)]
pub struct ToolDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    /// Registration order, so declarations are stable across calls
    order: Vec<String>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), handler).is_none() {
            self.order.push(name);
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Declarations of every registered tool, in registration order.
    pub fn declarations(&self) -> Vec<FunctionDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.declaration())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run an invocation. Never fails: errors are folded into the result.
    pub async fn dispatch(&self, invocation: &ToolInvocation, ctx: &ToolContext) -> ToolResult {
        let Some(handler) = self.handlers.get(&invocation.name) else {
            let err = ToolError::UnknownFunction(invocation.name.clone());
            warn!(call_id = %ctx.call_id, tool = %invocation.name, "Unknown tool requested");
            return ToolResult::failure(invocation, err.to_string());
        };

        info!(
            call_id = %ctx.call_id,
            tool = %invocation.name,
            invocation_id = %invocation.id,
            "Dispatching tool call"
        );

        match handler.call(&invocation.args, ctx).await {
            Ok(response) => ToolResult::success(invocation, response),
            Err(e) => {
                warn!(
                    call_id = %ctx.call_id,
                    tool = %invocation.name,
                    error = %e,
                    "Tool call failed"
                );
                ToolResult::failure(invocation, e.to_string())
            }
        }
    }
}
