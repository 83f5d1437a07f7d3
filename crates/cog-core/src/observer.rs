//! `ExecutionObserver`: read-only projections over contracts.
//!
//! Every function here is pure — no mutation, no collaborator calls. This is what lets
//! Reasoning perceive what happened without ever touching `ExecutionContract::status`
//! or `result` directly.

use crate::contract::{self, ContractStatus, ExecutionContract, StateMachineTopology, TransitionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConstraints {
    pub irreversible: bool,
    pub idempotency_key: Option<String>,
}

/// Everything a caller needs to render one contract's current state, without access to
/// its raw fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub execution_id: String,
    pub action_summary: String,
    pub current_status: ContractStatus,
    pub is_terminal: bool,
    pub is_stable: bool,
    pub is_resumable: bool,
    pub has_side_effects: bool,
    pub duration_in_state_ms: i64,
    pub transition_count: usize,
    pub last_actor: Option<String>,
    pub last_trigger: Option<contract::Trigger>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub constraints: ExecutionConstraints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsequenceLabel {
    Success,
    Failed,
    Rejected,
    Waiting,
}

/// The Reasoning-facing projection. Built deliberately narrower than
/// `ExecutionSnapshot` — no `current_status`, no raw
/// `transition_count` — so the prompt-assembly step in `nodes::reasoning` has no raw
/// status field available to read by mistake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConsequenceView {
    pub execution_id: String,
    pub action_summary: String,
    pub consequence_label: ConsequenceLabel,
    pub has_side_effects: bool,
    pub was_suspended: bool,
    pub is_still_pending: bool,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTimeline {
    pub session_id: String,
    pub contracts: Vec<ExecutionSnapshot>,
    pub transitions: Vec<TransitionRecord>,
    pub total_contracts: usize,
    pub terminal_contracts: usize,
    pub active_contracts: usize,
    pub has_suspended: bool,
    pub has_irreversible_completed: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Namespace for the projection functions — a unit struct rather than free functions so
/// call sites read `ExecutionObserver::snapshot(..)` like a fixed service with a stable
/// operation set.
pub struct ExecutionObserver;

impl ExecutionObserver {
    /// `duration_in_state_ms` is `now - timestamp_of_last_transition`; for a contract with
    /// no transitions yet (freshly `PENDING`), it's measured from `created_at`.
    pub fn snapshot(contract: &ExecutionContract, now: DateTime<Utc>) -> ExecutionSnapshot {
        let last = contract.transitions.last();
        let since = last.map(|t| t.timestamp).unwrap_or(contract.created_at);
        ExecutionSnapshot {
            execution_id: contract.execution_id.clone(),
            action_summary: contract.action_summary(),
            current_status: contract.status,
            is_terminal: contract.status.is_terminal(),
            is_stable: contract.status.is_stable(),
            is_resumable: contract.status.is_resumable(),
            has_side_effects: contract.irreversible && contract.status == ContractStatus::Completed,
            duration_in_state_ms: (now - since).num_milliseconds(),
            transition_count: contract.transitions.len(),
            last_actor: last.map(|t| t.actor.clone()),
            last_trigger: last.map(|t| t.trigger),
            result: contract.result.clone(),
            error_message: contract.error_message.clone(),
            constraints: ExecutionConstraints {
                irreversible: contract.irreversible,
                idempotency_key: contract.idempotency_key.clone(),
            },
        }
    }

    /// `was_suspended` is true iff any transition in history targets `WAITING`,
    /// not just the current status.
    pub fn consequence_view(contract: &ExecutionContract) -> ExecutionConsequenceView {
        let label = match contract.status {
            ContractStatus::Pending | ContractStatus::Running | ContractStatus::Waiting => ConsequenceLabel::Waiting,
            ContractStatus::Completed => ConsequenceLabel::Success,
            ContractStatus::Failed => ConsequenceLabel::Failed,
            ContractStatus::Rejected => ConsequenceLabel::Rejected,
            ContractStatus::Cancelled => ConsequenceLabel::Failed,
        };
        let was_suspended = contract.transitions.iter().any(|t| t.to_status == ContractStatus::Waiting);
        ExecutionConsequenceView {
            execution_id: contract.execution_id.clone(),
            action_summary: contract.action_summary(),
            consequence_label: label,
            has_side_effects: contract.irreversible && contract.status == ContractStatus::Completed,
            was_suspended,
            is_still_pending: !contract.status.is_terminal(),
            result: contract.result.clone(),
            error_message: contract.error_message.clone(),
        }
    }

    pub fn consequence_views(contracts: &[ExecutionContract]) -> Vec<ExecutionConsequenceView> {
        contracts.iter().map(Self::consequence_view).collect()
    }

    pub fn transition_records(contract: &ExecutionContract) -> Vec<TransitionRecord> {
        contract.transitions.clone()
    }

    /// Aggregates active + completed contracts into one session-level view. Contracts
    /// are ordered by `created_at`; transitions from every contract are merged and
    /// ordered by `timestamp`.
    pub fn timeline(session_id: impl Into<String>, contracts: &[ExecutionContract], now: DateTime<Utc>) -> ExecutionTimeline {
        let mut sorted: Vec<&ExecutionContract> = contracts.iter().collect();
        sorted.sort_by_key(|c| c.created_at);

        let mut all_transitions: Vec<TransitionRecord> =
        contracts.iter().flat_map(|c| c.transitions.iter().cloned()).collect();
        all_transitions.sort_by_key(|t| t.timestamp);

        let snapshots: Vec<ExecutionSnapshot> = sorted.iter().map(|c| Self::snapshot(c, now)).collect();
        let terminal_contracts = snapshots.iter().filter(|s| s.is_terminal).count();
        let has_suspended = snapshots.iter().any(|s| s.current_status == ContractStatus::Waiting);
        let has_irreversible_completed = snapshots.iter().any(|s| s.has_side_effects);

        ExecutionTimeline {
            session_id: session_id.into(),
            started_at: sorted.first().map(|c| c.created_at),
            ended_at: all_transitions.last().map(|t| t.timestamp),
            total_contracts: contracts.len(),
            terminal_contracts,
            active_contracts: contracts.len() - terminal_contracts,
            has_suspended,
            has_irreversible_completed,
            contracts: snapshots,
            transitions: all_transitions,
        }
    }

    /// Static; every call rebuilds the same value — see `contract::topology` for why
    /// this isn't memoized behind a `OnceLock`.
    pub fn topology() -> StateMachineTopology {
        contract::topology()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ActionDetail, ActorCategory, ContractType, Trigger};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn completed_contract(irreversible: bool) -> ExecutionContract {
        let mut c = ExecutionContract::new(
            "exec-1",
            ContractType::ToolCall,
            ActionDetail { service: "email".to_string(), method: "send".to_string(), arguments: serde_json::json!({}) },
            irreversible,
            None,
            now(),
        );
        c.transition(Trigger::Start, "tool_node", ActorCategory::System, now(), None, None, None).unwrap();
        c.transition(Trigger::Succeed, "tool_node", ActorCategory::System, now(), Some(serde_json::json!("ok")), None, None)
            .unwrap();
        c
    }

    #[test]
    fn completed_irreversible_contract_has_side_effects() {
        let c = completed_contract(true);
        let view = ExecutionObserver::consequence_view(&c);
        assert_eq!(view.consequence_label, ConsequenceLabel::Success);
        assert!(view.has_side_effects);
    }

    #[test]
    fn completed_reversible_contract_has_no_side_effects() {
        let c = completed_contract(false);
        let view = ExecutionObserver::consequence_view(&c);
        assert!(!view.has_side_effects);
    }

    #[test]
    fn was_suspended_true_once_contract_ever_reached_waiting() {
        let mut c = ExecutionContract::new(
            "exec-2",
            ContractType::EcsRequest,
            ActionDetail { service: "hitl".to_string(), method: "confirm".to_string(), arguments: serde_json::json!({}) },
            false,
            None,
            now(),
        );
        c.transition(Trigger::Start, "hitl_node", ActorCategory::System, now(), None, None, None).unwrap();
        c.transition(Trigger::Suspend, "hitl_node", ActorCategory::System, now(), None, None, None).unwrap();
        c.transition(Trigger::Resume, "graph_runner", ActorCategory::User, now(), None, None, None).unwrap();
        c.transition(Trigger::Succeed, "graph_runner", ActorCategory::User, now(), Some(serde_json::json!({})), None, None)
            .unwrap();
        assert!(ExecutionObserver::consequence_view(&c).was_suspended);
    }

    #[test]
    fn timeline_orders_transitions_by_timestamp_across_contracts() {
        let contracts = vec![completed_contract(false)];
        let timeline = ExecutionObserver::timeline("s1", &contracts, now());
        assert_eq!(timeline.total_contracts, 1);
        assert_eq!(timeline.terminal_contracts, 1);
        assert_eq!(timeline.active_contracts, 0);
    }

    #[test]
    fn topology_calls_are_deep_equal() {
        let a = ExecutionObserver::topology();
        let b = ExecutionObserver::topology();
        assert_eq!(serde_json::to_value(a).unwrap(), serde_json::to_value(b).unwrap());
    }
}
