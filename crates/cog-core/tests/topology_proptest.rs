//! Property-based fuzzing of the execution contract state machine: no sequence of
//! triggers ever produces a transition record absent from the static topology, and
//! `topology` itself is deterministic across calls.

use chrono::Utc;
use cog_core::observer::ExecutionObserver;
use cog_core::{ActionDetail, ActorCategory, ContractType, ExecutionContract, Trigger};
use proptest::prelude::*;

fn all_triggers() -> Vec<Trigger> {
    vec![
        Trigger::Start,
        Trigger::Suspend,
        Trigger::Resume,
        Trigger::Succeed,
        Trigger::Fail,
        Trigger::Reject,
        Trigger::Cancel,
        Trigger::Timeout,
    ]
}

fn trigger_strategy() -> impl Strategy<Value = Trigger> {
    prop::sample::select(all_triggers())
}

proptest! {
    /// Whatever random trigger sequence is thrown at a contract, every transition that
    /// actually lands in `transitions` matches a legal edge in the static topology, and
    /// illegal attempts leave the contract's status untouched.
    #[test]
    fn random_trigger_sequences_only_produce_legal_transitions(triggers in prop::collection::vec(trigger_strategy, 0..20)) {
        let topology = ExecutionObserver::topology();
        let mut contract = ExecutionContract::new(
            "exec-fuzz",
            ContractType::ToolCall,
            ActionDetail { service: "svc".to_string(), method: "op".to_string(), arguments: serde_json::json!({}) },
            false,
            None,
            Utc::now(),
        );

        for trigger in triggers {
            let status_before = contract.status;
            let result = contract.transition(trigger, "fuzzer", ActorCategory::System, Utc::now(), None, None, None);
            match result {
                Ok(()) => {
                    let last = contract.transitions.last().expect("successful transition recorded");
                    let is_legal_edge = topology
                        .edges
                        .iter()
                        .any(|(from, to, edge_trigger)| *from == status_before && *to == last.to_status && *edge_trigger == trigger);
                    prop_assert!(is_legal_edge, "recorded transition {:?} -> {:?} via {:?} is not in the topology", status_before, last.to_status, trigger);
                    prop_assert_eq!(last.from_status, status_before);
                }
                Err(_) => {
                    prop_assert_eq!(contract.status, status_before, "rejected transition must leave status unchanged");
                }
            }
        }

        for (i, record) in contract.transitions.iter().enumerate() {
            prop_assert_eq!(record.sequence_number, i as u32);
        }
    }

    /// `topology` is a pure function of no input; two calls (even interleaved with
    /// unrelated contract mutation) are deep-equal.
    #[test]
    fn topology_is_stable_across_calls(triggers in prop::collection::vec(trigger_strategy, 0..5)) {
        let a = ExecutionObserver::topology();
        let mut contract = ExecutionContract::new(
            "exec-fuzz",
            ContractType::ToolCall,
            ActionDetail { service: "svc".to_string(), method: "op".to_string(), arguments: serde_json::json!({}) },
            false,
            None,
            Utc::now(),
        );
        for trigger in triggers {
            let _ = contract.transition(trigger, "fuzzer", ActorCategory::System, Utc::now(), None, None, None);
        }
        let b = ExecutionObserver::topology();
        prop_assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }
}
