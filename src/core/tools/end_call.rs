use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{FunctionDefinition, ToolContext, ToolError, ToolHandler};
use crate::core::call_control::CallControl;

pub const END_CALL_TOOL: &str = "call_end";

/// Hangs up a call through the call-control collaborator.
///
/// The optional `callId` argument selects the call; without it the current
/// session's call is terminated.
pub struct EndCallTool {
    call_control: Arc<dyn CallControl>,
}

impl EndCallTool {
    pub fn new(call_control: Arc<dyn CallControl>) -> Self {
        Self { call_control }
    }
}

#[async_trait]
impl ToolHandler for EndCallTool {
    fn name(&self) -> &str {
        END_CALL_TOOL
    }

    fn declaration(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: END_CALL_TOOL.to_string(),
            description: "Ends the current phone call. Use when the conversation is complete or the caller asks to hang up.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "callId": {
                        "type": "string",
                        "description": "The call to terminate. Defaults to the current call."
                    }
                },
            }),
        }
    }

    async fn call(&self, args: &Map<String, Value>, ctx: &ToolContext) -> Result<Value, ToolError> {
        let target = match args.get("callId") {
            None | Some(Value::Null) => ctx.call_id.as_str(),
            Some(Value::String(id)) if id.trim().is_empty() => ctx.call_id.as_str(),
            Some(Value::String(id)) => id.as_str(),
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "callId must be a string, got {other}"
                )));
            }
        };

        self.call_control
            .terminate_call(target)
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        Ok(json!({ "status": "terminated", "callId": target }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call_control::CallControlError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingControl {
        terminated: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl CallControl for RecordingControl {
        async fn terminate_call(&self, call_id: &str) -> Result<(), CallControlError> {
            if self.fail {
                return Err(CallControlError::Rejected {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.terminated.lock().push(call_id.to_string());
            Ok(())
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            call_id: "session-call".into(),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_session_call() {
        let control = Arc::new(RecordingControl::default());
        let tool = EndCallTool::new(control.clone());

        let value = tool.call(&Map::new(), &ctx()).await.unwrap();
        assert_eq!(value["status"], "terminated");
        assert_eq!(*control.terminated.lock(), vec!["session-call".to_string()]);
    }

    #[tokio::test]
    async fn test_uses_explicit_call_id() {
        let control = Arc::new(RecordingControl::default());
        let tool = EndCallTool::new(control.clone());

        let mut args = Map::new();
        args.insert("callId".into(), json!("other-call"));
        let value = tool.call(&args, &ctx()).await.unwrap();
        assert_eq!(value["callId"], "other-call");
        assert_eq!(*control.terminated.lock(), vec!["other-call".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_non_string_call_id() {
        let tool = EndCallTool::new(Arc::new(RecordingControl::default()));
        let mut args = Map::new();
        args.insert("callId".into(), json!(42));
        assert!(matches!(
            tool.call(&args, &ctx()).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_reports_collaborator_failure() {
        let tool = EndCallTool::new(Arc::new(RecordingControl {
            fail: true,
            ..Default::default()
        }));
        let err = tool.call(&Map::new(), &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
