use anyhow::{anyhow, Result};
use tracing::debug;

use super::types::*;
use super::{Claude, Reply, TokenUsage};

pub struct ClaudePromptBuilder {
    agent: Claude,
    input: String,
    preamble: Option<String>,
    temperature: Option<f32>,
    max_turns: usize,
}

impl ClaudePromptBuilder {
    pub(crate) fn new(agent: Claude, input: String) -> Self {
        Self {
            agent,
            input,
            preamble: None,
            temperature: None,
            max_turns: 1,
        }
    }

    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn multi_turn(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Send the prompt, executing client-side tools in a loop until the model
    /// produces a final text answer. Usage accumulates across every turn.
    pub async fn send(self) -> Result<Reply<String>> {
        let client = self.agent.client();

        let mut request = ChatRequest::new(&self.agent.model);

        if let Some(temp) = self.temperature {
            request = request.temperature(temp);
        }

        if let Some(ref preamble) = self.preamble {
            request = request.system(preamble);
        }

        request = request.message(WireMessage::user(&self.input));

        for tool in &self.agent.tools {
            let def = tool.definition().await;
            request = request.tool(ToolDefinitionWire {
                name: def.name,
                description: def.description,
                input_schema: def.parameters,
            });
        }

        if request.tools.is_some() {
            request.tool_choice = Some(serde_json::json!({"type": "auto"}));
        }

        let mut usage = TokenUsage::default();

        // Multi-turn tool loop
        let mut turn = 0;
        loop {
            turn += 1;
            if turn > self.max_turns {
                return Err(anyhow!("Max turns ({}) exceeded", self.max_turns));
            }

            let response = client.chat(&request).await?;
            usage.absorb(response.usage.unwrap_or_default().into());

            let tool_uses = response.tool_uses();
            if !tool_uses.is_empty() && response.stop_reason.as_deref() == Some("tool_use") {
                request
                    .messages
                    .push(WireMessage::assistant_blocks(response.content.clone()));

                let mut results = Vec::new();
                for block in &tool_uses {
                    if let ContentBlock::ToolUse { id, name, input } = block {
                        let tool = self
                            .agent
                            .tools
                            .iter()
                            .find(|t| t.name() == name.as_str())
                            .ok_or_else(|| anyhow!("Tool not found: {}", name))?;

                        debug!(tool = %name, "Executing tool call");

                        let result = match tool.call_json(input.clone()).await {
                            Ok(v) => serde_json::to_string(&v)?,
                            Err(e) => format!("Error: {}", e),
                        };

                        results.push(ContentBlock::ToolResult {
                            tool_use_id: id.clone(),
                            content: result,
                        });
                    }
                }

                request.messages.push(WireMessage::tool_results(results));
                continue;
            }

            return Ok(Reply {
                value: response.text().unwrap_or_default(),
                usage,
            });
        }
    }
}
