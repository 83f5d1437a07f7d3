//! Node: HITL/ECS. Suspends the run to ask the user to fill a form or
//! acknowledge a read-only display, recording the pause as an `ecs_request` contract.

use super::Node;
use crate::contract::{ActionDetail, ActorCategory, ContractType, ExecutionContract, Trigger};
use crate::error::{GraphError, Result};
use crate::events::StreamEvent;
use crate::state::{GraphState, HitlRequest, RunStatus, StateUpdate};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

pub struct HitlNode {
    chain_cap: usize,
}

impl HitlNode {
    pub fn new(chain_cap: usize) -> Self {
        Self { chain_cap }
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
            has_side_effects: false,
            timestamp: last.timestamp,
        }
    }
}

#[async_trait]
impl Node for HitlNode {
    fn name(&self) -> &'static str {
        "hitl"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let Some(request) = state.hitl_request.clone() else {
            return Ok((StateUpdate::default(), Vec::new()));
        };

        // Beyond the chain-depth cap the request is dropped silently and a warning
        // text event stands in for it — this never fails the run.
        if state.hitl_chain_depth >= self.chain_cap {
            return Ok((
                    StateUpdate { hitl_request: Some(None), ..Default::default() },
                    vec![StreamEvent::Text {
                            content: format!(
                                "(HITL request \"{}\" suppressed: chain depth cap of {} reached)",
                                request.title(),
                                self.chain_cap
                            ),
                    }],
            ));
        }

        let now = Utc::now();
        let mut contract = ExecutionContract::new(
            Uuid::new_v4().to_string(),
            ContractType::EcsRequest,
            ActionDetail { service: "hitl".to_string(), method: request.kind_str().to_string(), arguments: serde_json::json!({"id": request.id()}) },
            false,
            None,
            now,
        );
        contract.transition(Trigger::Start, "hitl_node", ActorCategory::System, now, None, None, None)?;
        let mut events = vec![Self::execution_state_event(&contract)];
        events.push(StreamEvent::Hitl(request.clone()));

        contract.transition(Trigger::Suspend, "hitl_node", ActorCategory::System, Utc::now(), None, None, None)?;
        events.push(Self::execution_state_event(&contract));

        let mut stored = serde_json::json!({
                "type": request.kind_str(),
                "timestamp": Utc::now(),
        });
        if let HitlRequest::VisualDisplay { displays, .. } = &request {
            stored["displays"] = serde_json::to_value(displays).unwrap_or(serde_json::Value::Null);
            stored["displays_def"] = serde_json::to_value(displays).unwrap_or(serde_json::Value::Null);
        }
        let context_key = format!("hitl_{}", request.title());

        Ok((
                StateUpdate {
                    status: Some(RunStatus::Suspended),
                    hitl_chain_depth_increment: true,
                    context_variable: Some((context_key, stored)),
                    new_active_execution: Some(contract),
                    ..Default::default()
                },
                events,
        ))
    }
}

impl HitlRequest {
    fn kind_str(&self) -> &'static str {
        match self.kind() {
            crate::state::HitlRequestKind::Form => "form",
            crate::state::HitlRequestKind::VisualDisplay => "visual_display",
        }
    }
}

/// Resume-path helper used by `GraphRunner::resume`: transitions the one `WAITING`
/// contract and records the user's response into `context_variables`.
pub fn apply_hitl_response(
    state: &mut GraphState,
    action: HitlResponseAction,
    data: Option<serde_json::Value>,
) -> Result<()> {
    let now = Utc::now();
    let contract = state
        .active_executions
        .iter_mut()
        .find(|c| c.status == crate::contract::ContractStatus::Waiting)
        .ok_or_else(|| GraphError::AlignmentFailure {
            session_id: state.session_id.clone(),
            reason: "no WAITING contract found for resume".to_string(),
    })?;
    let execution_id = contract.execution_id.clone();

    contract.transition(Trigger::Resume, "graph_runner", ActorCategory::User, now, None, None, None)?;

    if let Some(title) = state.hitl_request.as_ref().map(|r| r.title().to_string()) {
        let key = format!("hitl_{title}");
        if let Some(existing) = state.context_variables.get(&key).cloned() {
            let mut merged = existing;
            match action {
                HitlResponseAction::Approve | HitlResponseAction::Edit => {
                    merged["response"] = serde_json::json!({"action": action.as_str(), "data": data});
                }
                HitlResponseAction::Reject => {
                    merged["response"] = serde_json::json!({"action": "reject"});
                }
                HitlResponseAction::Dismiss => {
                    merged["response"] = serde_json::json!({"action": "dismiss"});
                }
            }
            state.context_variables.set(key, merged, usize::MAX);
        }
    }

    let contract = state.find_active_mut(&execution_id).expect("just resumed");
    match action {
        HitlResponseAction::Reject => {
            contract.transition(Trigger::Reject, "graph_runner", ActorCategory::User, Utc::now(), None, None, None)?;
        }
        _ => {
            contract.transition(
                Trigger::Succeed,
                "graph_runner",
                ActorCategory::User,
                Utc::now(),
                Some(data.clone().unwrap_or(serde_json::Value::Null)),
                None,
                None,
            )?;
        }
    }
    state.complete_active(&execution_id);
    state.hitl_request = None;
    state.status = RunStatus::Running;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlResponseAction {
    Approve,
    Edit,
    Reject,
    Dismiss,
}

impl HitlResponseAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Edit => "edit",
            Self::Reject => "reject",
            Self::Dismiss => "dismiss",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{HitlActions, HitlField};

    fn form_request() -> HitlRequest {
        HitlRequest::Form {
            id: "req-1".to_string(),
            title: "Confirm send email".to_string(),
            description: None,
            fields: vec![HitlField {
                    name: "to".to_string(),
                    field_type: "text".to_string(),
                    label: "To".to_string(),
                    required: true,
                    options: None,
                    default: None,
                    min: None,
                    max: None,
                    step: None,
                    placeholder: None,
            }],
            actions: Some(HitlActions { approve: Some("Send".to_string()), edit: None, reject: Some("Cancel".to_string()) }),
            session_id: "s1".to_string(),
            ttl_seconds: None,
            readonly: None,
        }
    }

    #[tokio::test]
    async fn form_request_suspends_run_and_emits_hitl_event() {
        let node = HitlNode::new(5);
        let mut state = GraphState::new("s1");
        state.hitl_request = Some(form_request());
        let (update, events) = node.compute(&state).await.unwrap();
        assert_eq!(update.status, Some(RunStatus::Suspended));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Hitl(_))));
        let contract = update.new_active_execution.unwrap();
        assert_eq!(contract.status, crate::contract::ContractStatus::Waiting);
    }

    #[tokio::test]
    async fn request_beyond_chain_cap_is_suppressed() {
        let node = HitlNode::new(1);
        let mut state = GraphState::new("s1");
        state.hitl_chain_depth = 1;
        state.hitl_request = Some(form_request());
        let (update, events) = node.compute(&state).await.unwrap();
        assert_eq!(update.hitl_request.flatten(), None);
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Text {.. })));
    }

    #[test]
    fn resume_approve_transitions_waiting_contract_to_completed() {
        let mut state = GraphState::new("s1");
        let node = HitlNode::new(5);
        let rt = tokio::runtime::Runtime::new().unwrap();
        state.hitl_request = Some(form_request());
        let (update, _) = rt.block_on(node.compute(&state)).unwrap();
        update.clone().merge_into(&mut state, 1024);
        assert_eq!(state.active_executions.len(), 1);

        apply_hitl_response(&mut state, HitlResponseAction::Approve, Some(serde_json::json!({"to": "bob@example.com"}))).unwrap();
        assert!(state.active_executions.is_empty());
        assert_eq!(state.completed_executions.len(), 1);
        assert_eq!(state.completed_executions[0].status, crate::contract::ContractStatus::Completed);
        assert_eq!(state.status, RunStatus::Running);
    }
}
