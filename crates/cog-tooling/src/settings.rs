//! Process-wide settings for the cognitive graph core.
//!
//! `Settings` is loaded once (typically at process start) and handed to the runner as
//! an explicit dependency — rules out global mutable singletons, so nodes read
//! these values off the `Settings` the runner was constructed with, not off statics.

use crate::config::{get_env_bool, get_env_or, get_env_parse_or, ConfigBuilder};
use crate::Result;

/// Tunables shared across the graph: the Intent node's process-wide toggle, the HITL
/// chain-depth cap (default 5), the `context_variables` byte budget that drives LRU
/// eviction, and the dialogue-history truncation length used by the checkpoint store.
#[derive(Debug, Clone)]
pub struct Settings {
    pub intent_recognition_enabled: bool,
    pub intent_layer2_enabled: bool,
    pub hitl_chain_cap: usize,
    pub context_variables_byte_budget: usize,
    pub dialogue_history_max_len: Option<usize>,
    pub base_system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            intent_recognition_enabled: true,
            intent_layer2_enabled: true,
            hitl_chain_cap: 5,
            context_variables_byte_budget: 64 * 1024,
            dialogue_history_max_len: Some(200),
            base_system_prompt: "You are a helpful assistant.".to_string(),
        }
    }
}

impl ConfigBuilder for Settings {
    fn validate(&self) -> Result<()> {
        if self.hitl_chain_cap == 0 {
            return Err(crate::ToolingError::General(
                    "hitl_chain_cap must be non-zero".to_string(),
            ));
        }
        if self.context_variables_byte_budget == 0 {
            return Err(crate::ToolingError::General(
                    "context_variables_byte_budget must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Settings::default();
        Ok(Self {
                intent_recognition_enabled: get_env_bool(&format!("{prefix}INTENT_RECOGNITION_ENABLED"))?
                    .unwrap_or(defaults.intent_recognition_enabled),
                intent_layer2_enabled: get_env_bool(&format!("{prefix}INTENT_LAYER2_ENABLED"))?
                    .unwrap_or(defaults.intent_layer2_enabled),
                hitl_chain_cap: get_env_parse_or(&format!("{prefix}HITL_CHAIN_CAP"), defaults.hitl_chain_cap)?,
                context_variables_byte_budget: get_env_parse_or(
                    &format!("{prefix}CONTEXT_VARIABLES_BYTE_BUDGET"),
                    defaults.context_variables_byte_budget,
                )?,
                dialogue_history_max_len: get_env_parse_or(
                    &format!("{prefix}DIALOGUE_HISTORY_MAX_LEN"),
                    defaults.dialogue_history_max_len.unwrap_or(0),
                )
                    .map(|v: usize| if v == 0 { None } else { Some(v) })?,
                base_system_prompt: get_env_or(&format!("{prefix}BASE_SYSTEM_PROMPT"), defaults.base_system_prompt)?,
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        *self = other;
        self
    }
}
