//! `ExecutionContract`: the per-operation state machine.
//!
//! Seven statuses, twelve legal transitions. A contract is mutated only by
//! [`ExecutionContract::transition`], which checks the move against
//! [`StateMachineTopology`] before touching anything — on rejection, the contract is
//! byte-for-byte unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Pending,
    Running,
    Waiting,
    Completed,
    Failed,
    Rejected,
    Cancelled,
}

impl ContractStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Rejected | Self::Cancelled)
    }

    /// Terminal ∪ `WAITING` — the statuses a contract can sit in indefinitely between
    /// runner supersteps.
    pub fn is_stable(self) -> bool {
        self.is_terminal() || matches!(self, Self::Waiting)
    }

    pub fn is_resumable(self) -> bool {
        matches!(self, Self::Waiting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Suspend,
    Resume,
    Succeed,
    Fail,
    Reject,
    Cancel,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorCategory {
    System,
    Tool,
    User,
    Policy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    ToolCall,
    EcsRequest,
    ImageMemory,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDetail {
    pub service: String,
    pub method: String,
    pub arguments: serde_json::Value,
}

impl ActionDetail {
    /// Default `action_summary` format, `"{service}.{method}"`.
    pub fn summary(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub sequence_number: u32,
    pub from_status: ContractStatus,
    pub to_status: ContractStatus,
    pub trigger: Trigger,
    pub actor: String,
    pub actor_category: ActorCategory,
    pub timestamp: DateTime<Utc>,
    pub payload: Option<serde_json::Value>,
}

/// One legal edge in the topology, paired with the trigger that walks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEdge {
    pub from: ContractStatus,
    pub to: ContractStatus,
    pub trigger: Trigger,
}

/// A forbidden transition, kept alongside a human-readable reason so `StateMachineTopology`
/// can explain a rejection instead of only rejecting it.
#[derive(Debug, Clone, Copy)]
pub struct ForbiddenTransition {
    pub from: ContractStatus,
    pub to: ContractStatus,
    pub reason: &'static str,
}

/// The static set of statuses, legal edges, and forbidden transitions. Computed fresh by
/// [`topology`](crate::observer::ExecutionObserver::topology) each call — cheap enough
/// (fixed-size vectors) that caching isn't worth the complexity, and two calls stay
/// deep-equal regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMachineTopology {
    pub statuses: Vec<ContractStatus>,
    pub edges: Vec<(ContractStatus, ContractStatus, Trigger)>,
    pub forbidden: Vec<(ContractStatus, ContractStatus, String)>,
    pub terminal_statuses: Vec<ContractStatus>,
    pub resumable_statuses: Vec<ContractStatus>,
    pub initial_status: ContractStatus,
}

const EDGES: &[TransitionEdge] = {
    use ContractStatus::*;
    use Trigger::*;
    &[
        TransitionEdge { from: Pending, to: Running, trigger: Start },
        TransitionEdge { from: Running, to: Waiting, trigger: Suspend },
        TransitionEdge { from: Waiting, to: Running, trigger: Resume },
        TransitionEdge { from: Running, to: Completed, trigger: Succeed },
        TransitionEdge { from: Running, to: Failed, trigger: Fail },
        TransitionEdge { from: Pending, to: Rejected, trigger: Reject },
        TransitionEdge { from: Waiting, to: Rejected, trigger: Reject },
        TransitionEdge { from: Pending, to: Cancelled, trigger: Cancel },
        TransitionEdge { from: Running, to: Cancelled, trigger: Cancel },
        TransitionEdge { from: Waiting, to: Cancelled, trigger: Cancel },
        TransitionEdge { from: Waiting, to: Failed, trigger: Timeout },
    ]
};

/// Builds the static topology. A free function rather than a `const` because
/// `StateMachineTopology` owns `Vec`s/`String`s for JSON transport (`GET
/// /api/execution/topology`), which aren't `const`-constructible.
pub fn topology() -> StateMachineTopology {
    use ContractStatus::*;

    let forbidden = vec![
        (Waiting, Completed, "must re-enter RUNNING before COMPLETED".to_string()),
        (Pending, Completed, "PENDING must start RUNNING before completing".to_string()),
        (Pending, Failed, "PENDING must start RUNNING before failing".to_string()),
        (Pending, Waiting, "PENDING must start RUNNING before suspending".to_string()),
    ];

    StateMachineTopology {
        statuses: vec![Pending, Running, Waiting, Completed, Failed, Rejected, Cancelled],
        edges: EDGES.iter().map(|e| (e.from, e.to, e.trigger)).collect(),
        forbidden,
        terminal_statuses: vec![Completed, Failed, Rejected, Cancelled],
        resumable_statuses: vec![Waiting],
        initial_status: Pending,
    }
}

fn is_legal(from: ContractStatus, to: ContractStatus, trigger: Trigger) -> bool {
    if from.is_terminal() {
        return false;
    }
    EDGES.iter().any(|e| e.from == from && e.to == to && e.trigger == trigger)
}

#[derive(Debug, thiserror::Error)]
#[error("illegal transition: {from:?} -> {to:?} on {trigger:?} for execution {execution_id}")]
pub struct IllegalTransition {
    pub execution_id: String,
    pub from: ContractStatus,
    pub to: ContractStatus,
    pub trigger: Trigger,
}

/// One entry in `pending_tool_calls`-derived contracts, a suspended `hitl_request`, or an
/// image-memory write — the lifecycle record of one side-effectful or suspendable action
/// ("ExecutionContract").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContract {
    pub execution_id: String,
    pub contract_type: ContractType,
    pub action_detail: ActionDetail,
    pub status: ContractStatus,
    pub irreversible: bool,
    pub idempotency_key: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub transitions: Vec<TransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub resumable_at: Option<DateTime<Utc>>,
    action_summary_override: Option<String>,
}

impl ExecutionContract {
    pub fn new(
        execution_id: impl Into<String>,
        contract_type: ContractType,
        action_detail: ActionDetail,
        irreversible: bool,
        idempotency_key: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            contract_type,
            action_detail,
            status: ContractStatus::Pending,
            irreversible,
            idempotency_key,
            result: None,
            error_message: None,
            transitions: Vec::new(),
            created_at,
            resumable_at: None,
            action_summary_override: None,
        }
    }

    pub fn with_action_summary_override(mut self, summary: impl Into<String>) -> Self {
        self.action_summary_override = Some(summary.into());
        self
    }

    pub fn action_summary(&self) -> String {
        self.action_summary_override.clone().unwrap_or_else(|| self.action_detail.summary())
    }

    /// Validates `trigger` against the topology, then — only if legal — appends a
    /// `TransitionRecord` with a monotonically increasing `sequence_number` and updates
    /// `status`/`result`/`error_message`. On `Succeed`, `result` must be `Some`; on
    /// `Fail`, `error_message` must be `Some`. On an illegal move, the contract is
    /// returned unchanged — callers observe this as `IllegalTransition`.
    pub fn transition(
        &mut self,
        trigger: Trigger,
        actor: impl Into<String>,
        actor_category: ActorCategory,
        now: DateTime<Utc>,
        result: Option<serde_json::Value>,
        error_message: Option<String>,
        payload: Option<serde_json::Value>,
    ) -> Result<(), IllegalTransition> {
        let to = target_status(self.status, trigger).ok_or_else(|| IllegalTransition {
                execution_id: self.execution_id.clone(),
                from: self.status,
                to: self.status,
                trigger,
        })?;

        if !is_legal(self.status, to, trigger) {
            return Err(IllegalTransition { execution_id: self.execution_id.clone(), from: self.status, to, trigger });
        }
        if trigger == Trigger::Succeed && result.is_none() {
            return Err(IllegalTransition { execution_id: self.execution_id.clone(), from: self.status, to, trigger });
        }
        if trigger == Trigger::Fail && error_message.is_none() {
            return Err(IllegalTransition { execution_id: self.execution_id.clone(), from: self.status, to, trigger });
        }

        let sequence_number = self.transitions.len() as u32;
        self.transitions.push(TransitionRecord {
                sequence_number,
                from_status: self.status,
                to_status: to,
                trigger,
                actor: actor.into(),
                actor_category,
                timestamp: now,
                payload,
        });
        self.status = to;
        if let Some(r) = result {
            self.result = Some(r);
        }
        if let Some(e) = error_message {
            self.error_message = Some(e);
        }
        Ok(())
    }
}

/// The one destination status reachable from `from` on `trigger`, independent of the
/// legality check — lets `transition` report `{from, to}` in `IllegalTransition` even when
/// `to` wouldn't otherwise be derivable from a single enum variant.
fn target_status(from: ContractStatus, trigger: Trigger) -> Option<ContractStatus> {
    EDGES.iter().find(|e| e.from == from && e.trigger == trigger).map(|e| e.to).or_else(|| {
            // Triggers whose destination doesn't depend on the legal-edge table lookup
            // (e.g. calling `succeed` from an already-terminal status) still need a `to` to
            // report in the error; reuse whichever edge exists for that trigger from any
            // status, falling back to `from` itself so the error at least type-checks.
            EDGES.iter().find(|e| e.trigger == trigger).map(|e| e.to).or(Some(from))
    })
}
