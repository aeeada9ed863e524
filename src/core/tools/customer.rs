use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{FunctionDefinition, ToolContext, ToolError, ToolHandler};

pub const CUSTOMER_INFO_TOOL: &str = "get_customer_info";

/// Caller profile returned by `get_customer_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub address: String,
}

impl Default for CustomerProfile {
    fn default() -> Self {
        Self {
            name: "John Doe".to_string(),
            age: 35,
            gender: "Male".to_string(),
            address: "123 Main St, Mumbai, India".to_string(),
        }
    }
}

/// Returns the configured caller profile. Takes no arguments.
pub struct CustomerInfoTool {
    profile: CustomerProfile,
}

impl CustomerInfoTool {
    pub fn new(profile: CustomerProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ToolHandler for CustomerInfoTool {
    fn name(&self) -> &str {
        CUSTOMER_INFO_TOOL
    }

    fn declaration(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: CUSTOMER_INFO_TOOL.to_string(),
            description: "Returns the customer's basic profile information such as name, age, gender and address".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
            }),
        }
    }

    async fn call(
        &self,
        _args: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        tracing::debug!(call_id = %ctx.call_id, "Looking up customer profile");
        serde_json::to_value(&self.profile).map_err(|e| ToolError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_profile_fields() {
        let tool = CustomerInfoTool::new(CustomerProfile::default());
        let ctx = ToolContext {
            call_id: "abc".into(),
        };
        let value = tool.call(&Map::new(), &ctx).await.unwrap();
        assert_eq!(value["name"], "John Doe");
        assert_eq!(value["age"], 35);
        assert_eq!(value["gender"], "Male");
        assert_eq!(value["address"], "123 Main St, Mumbai, India");
    }

    #[test]
    fn test_declaration_has_no_required_params() {
        let decl = CustomerInfoTool::new(CustomerProfile::default()).declaration();
        assert_eq!(decl.name, "get_customer_info");
        assert_eq!(decl.parameters["type"], "object");
        assert!(decl.parameters.get("required").is_none());
    }
}
