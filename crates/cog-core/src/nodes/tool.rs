//! Node: Tool. Executes the head of `pending_tool_calls`, protecting
//! irreversible or repeatable actions with an idempotency key derived from the tool name
//! and its canonicalized arguments.

use super::Node;
use crate::collaborators::tools::McpToolClient;
use crate::contract::{ActionDetail, ActorCategory, ContractType, ExecutionContract, Trigger};
use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{GraphState, StateUpdate};
use async_trait::async_trait;
use chrono::Utc;
use sha1::{Digest, Sha1};
use std::sync::Arc;
use uuid::Uuid;

pub struct ToolNode {
    client: Arc<dyn McpToolClient>,
}

impl ToolNode {
    pub fn new(client: Arc<dyn McpToolClient>) -> Self {
        Self { client }
    }

    /// `"{tool}:sha1({stable_json_args})"` — stable across field order so two calls with
    /// the same logical arguments collapse to the same key.
    fn idempotency_key(tool: &str, arguments: &serde_json::Value) -> String {
        let canonical = cog_tooling::serialization::stable_json_string(arguments).unwrap_or_else(|_| arguments.to_string());
        let mut hasher = Sha1::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{tool}:{hex}")
    }

    fn execution_state_event(contract: &ExecutionContract) -> StreamEvent {
        let last = contract.transitions.last().expect("transition just appended");
        StreamEvent::ExecutionState {
            execution_id: contract.execution_id.clone(),
            action_summary: contract.action_summary(),
            from_status: format!("{:?}", last.from_status),
            to_status: format!("{:?}", last.to_status),
            trigger: format!("{:?}", last.trigger),
            actor_category: format!("{:?}", last.actor_category),
            is_terminal: contract.status.is_terminal(),
            is_resumable: contract.status.is_resumable(),
            has_side_effects: contract.irreversible && contract.status == crate::contract::ContractStatus::Completed,
            timestamp: last.timestamp,
        }
    }
}

#[async_trait]
impl Node for ToolNode {
    fn name(&self) -> &'static str {
        "tool"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let Some(call) = state.pending_tool_calls.first().cloned() else {
            return Ok((StateUpdate::default(), Vec::new()));
        };
        let now = Utc::now();

        let (service, method) = call.tool.split_once('.').unwrap_or((call.tool.as_str(), ""));
        let idempotency_key =
        if call.idempotent { Some(Self::idempotency_key(&call.tool, &call.arguments)) } else { None };

        // Idempotency short-circuit: a prior COMPLETED contract with the same key
        // means the tool is not invoked again; a synthetic SUCCESS is surfaced instead.
        if let Some(key) = &idempotency_key {
            if let Some(prior) = state.find_completed_by_idempotency_key(key) {
                let mut remaining = state.pending_tool_calls.clone();
                remaining.remove(0);
                let observation = format!("{} (cached): {}", prior.action_summary(), prior.result.clone().unwrap_or_default());
                let event = StreamEvent::ToolResult {
                    tool: call.tool.clone(),
                    result: prior.result.clone(),
                    error: None,
                };
                return Ok((
                        StateUpdate {
                            pending_tool_calls: Some(remaining),
                            observation: Some(Some(observation)),
                            ..Default::default()
                        },
                        vec![event],
                ));
            }
        }

        let mut contract = ExecutionContract::new(
            Uuid::new_v4().to_string(),
            ContractType::ToolCall,
            ActionDetail { service: service.to_string(), method: method.to_string(), arguments: call.arguments.clone() },
            call.irreversible,
            idempotency_key,
            now,
        );

        contract.transition(Trigger::Start, "tool_node", ActorCategory::System, now, None, None, None)?;
        let mut events = vec![Self::execution_state_event(&contract)];

        let mut remaining = state.pending_tool_calls.clone();
        remaining.remove(0);

        let observation;
        match self.client.invoke(service, method, call.arguments.clone()).await {
            Ok(result) => {
                observation = format!("{}: {}", contract.action_summary(), result);
                contract.transition(Trigger::Succeed, "tool_node", ActorCategory::System, Utc::now(), Some(result.clone()), None, None)?;
                events.push(Self::execution_state_event(&contract));
                events.push(StreamEvent::ToolResult { tool: call.tool.clone(), result: Some(result), error: None });
            }
            Err(err) => {
                observation = format!("{}: {}", contract.action_summary(), err);
                contract.transition(Trigger::Fail, "tool_node", ActorCategory::System, Utc::now(), None, Some(err.0.clone()), None)?;
                events.push(Self::execution_state_event(&contract));
                events.push(StreamEvent::ToolResult { tool: call.tool.clone(), result: None, error: Some(err.0) });
            }
        }

        Ok((
                StateUpdate {
                    pending_tool_calls: Some(remaining),
                    observation: Some(Some(observation)),
                    new_active_execution: Some(contract),
                    ..Default::default()
                },
                events,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::tools::InMemoryMcpToolClient;
    use crate::state::ToolCallRequest;

    fn add_call() -> ToolCallRequest {
        ToolCallRequest {
            tool: "math.add".to_string(),
            arguments: serde_json::json!({"a": 2, "b": 3}),
            irreversible: false,
            idempotent: true,
        }
    }

    #[tokio::test]
    async fn successful_call_completes_contract_and_sets_observation() {
        let node = ToolNode::new(Arc::new(InMemoryMcpToolClient::new()));
        let mut state = GraphState::new("s1");
        state.pending_tool_calls.push(add_call());

        let (update, events) = node.compute(&state).await.unwrap();
        assert!(update.pending_tool_calls.unwrap().is_empty());
        assert!(update.observation.flatten().unwrap().contains("math.add"));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolResult {.. })));
    }

    #[tokio::test]
    async fn second_identical_call_short_circuits_via_idempotency_key() {
        let node = ToolNode::new(Arc::new(InMemoryMcpToolClient::new()));
        let mut state = GraphState::new("s1");
        state.pending_tool_calls.push(add_call());
        let (update, _) = node.compute(&state).await.unwrap();
        update.merge_into(&mut state, 1024);
        assert!(state.completed_executions.iter().any(|c| c.idempotency_key.is_some()));
        state.pending_tool_calls.push(add_call());

        let (update2, events2) = node.compute(&state).await.unwrap();
        assert!(update2.new_active_execution.is_none());
        assert!(events2.iter().any(|e| matches!(e, StreamEvent::ToolResult {.. })));
    }

    #[tokio::test]
    async fn failed_call_transitions_contract_to_failed() {
        struct FailingClient;
        #[async_trait]
        impl McpToolClient for FailingClient {
            fn metadata(&self, _s: &str, _m: &str) -> Option<crate::collaborators::tools::ToolMetadata> {
                None
            }
            async fn invoke(&self, _s: &str, _m: &str, _a: serde_json::Value) -> std::result::Result<serde_json::Value, crate::collaborators::tools::ToolInvokeError> {
                Err(crate::collaborators::tools::ToolInvokeError("boom".to_string()))
            }
        }
        let node = ToolNode::new(Arc::new(FailingClient));
        let mut state = GraphState::new("s1");
        state.pending_tool_calls.push(ToolCallRequest {
                tool: "x.y".to_string(),
                arguments: serde_json::json!({}),
                irreversible: false,
                idempotent: false,
        });
        let (update, events) = node.compute(&state).await.unwrap();
        let contract = update.new_active_execution.unwrap();
        assert_eq!(contract.status, crate::contract::ContractStatus::Failed);
        assert!(events.iter().any(|e| matches!(e, StreamEvent::ToolResult { error: Some(_), .. })));
    }
}
