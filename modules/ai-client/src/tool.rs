use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Definition of a tool as presented to the model.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// A typed tool the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    const NAME: &'static str;

    type Error: std::error::Error + Send + Sync + 'static;
    type Args: DeserializeOwned + Send;
    type Output: Serialize + Send;

    async fn definition(&self) -> ToolDefinition;
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;
}

/// Object-safe tool interface used by the agent's tool loop.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> String;
    async fn definition(&self) -> ToolDefinition;
    async fn call_json(&self, input: serde_json::Value) -> Result<serde_json::Value>;
}

/// Adapter from a typed [`Tool`] to the object-safe [`DynTool`].
pub struct ToolWrapper<T: Tool>(pub T);

#[async_trait]
impl<T: Tool> DynTool for ToolWrapper<T> {
    fn name(&self) -> String {
        T::NAME.to_string()
    }

    async fn definition(&self) -> ToolDefinition {
        self.0.definition().await
    }

    async fn call_json(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let args: T::Args = serde_json::from_value(input)
            .map_err(|e| anyhow!("Invalid arguments for tool {}: {}", T::NAME, e))?;
        let output = self
            .0
            .call(args)
            .await
            .map_err(|e| anyhow!("Tool {} failed: {}", T::NAME, e))?;
        Ok(serde_json::to_value(output)?)
    }
}
