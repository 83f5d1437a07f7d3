//! Node: Intent. Two-layer classifier: a prioritized rule list, then
//! optionally a lightweight LLM call when no rule matches.

use super::Node;
use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{GraphState, IntentResult, IntentSource, StateUpdate};
use async_trait::async_trait;
use cog_llm::{ChatModel, ChatRequest};
use regex::Regex;
use std::sync::Arc;

/// One entry in the Layer 1 rule list. First match (by list order) wins.
pub struct IntentRule {
    pub rule_id: String,
    pub pattern: Regex,
    pub category: String,
    pub intent_type: String,
    pub mcp_service: Option<String>,
}

impl IntentRule {
    pub fn new(rule_id: impl Into<String>, pattern: &str, category: impl Into<String>, intent_type: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            pattern: Regex::new(pattern).expect("static intent rule pattern must compile"),
            category: category.into(),
            intent_type: intent_type.into(),
            mcp_service: None,
        }
    }

    pub fn with_mcp_service(mut self, service: impl Into<String>) -> Self {
        self.mcp_service = Some(service.into());
        self
    }
}

pub struct IntentNode {
    enabled: bool,
    layer2_enabled: bool,
    rules: Vec<IntentRule>,
    layer2_model: Option<Arc<dyn ChatModel>>,
}

impl IntentNode {
    pub fn new(enabled: bool, layer2_enabled: bool, rules: Vec<IntentRule>, layer2_model: Option<Arc<dyn ChatModel>>) -> Self {
        Self { enabled, layer2_enabled, rules, layer2_model }
    }

    fn match_layer1(&self, text: &str) -> Option<IntentResult> {
        self.rules.iter().find(|rule| rule.pattern.is_match(text)).map(|rule| IntentResult {
                category: rule.category.clone(),
                intent_type: rule.intent_type.clone(),
                confidence: 1.0,
                source: IntentSource::Layer1,
                matched_rule: Some(rule.rule_id.clone()),
                mcp_service: rule.mcp_service.clone(),
        })
    }

    /// Layer 2 classifier prompt: ask for a one-line `category|intent_type|confidence`
    /// triple rather than free text, so parsing stays a single `split`.
    async fn classify_layer2(&self, text: &str) -> Option<IntentResult> {
        let model = self.layer2_model.as_ref()?;
        let prompt = format!(
            "Classify the intent of this message in the form category|intent_type|confidence (0-1):\n{}",
            text
        );
        let request = ChatRequest::new(vec![cog_llm::ChatMessage::user(prompt)]);
        let response = model.chat(request).await.ok()?;
        let mut parts = response.content.trim().splitn(3, '|');
        let category = parts.next()?.trim().to_string();
        let intent_type = parts.next()?.trim().to_string();
        let confidence: f32 = parts.next()?.trim().parse().ok()?;
        if confidence < 0.7 {
            return None;
        }
        Some(IntentResult { category, intent_type, confidence, source: IntentSource::Layer2, matched_rule: None, mcp_service: None })
    }
}

#[async_trait]
impl Node for IntentNode {
    fn name(&self) -> &'static str {
        "intent"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        if !self.enabled {
            return Ok((StateUpdate::default(), Vec::new()));
        }

        let text = &state.semantic_input.text;
        let result = if let Some(hit) = self.match_layer1(text) {
            hit
        } else if self.layer2_enabled {
            match self.classify_layer2(text).await {
                Some(hit) => hit,
                None => IntentResult::fallback(),
            }
        } else {
            IntentResult::fallback()
        };

        let mut semantic_input = state.semantic_input.clone();
        semantic_input.intent = Some(result.intent_type.clone());

        Ok((
                StateUpdate { semantic_input: Some(semantic_input), intent_result: Some(result), ..Default::default() },
                Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<IntentRule> {
        vec![IntentRule::new("math_add", r"(?i)add\s+\d+", "tool", "mcp_tool").with_mcp_service("math")]
    }

    #[tokio::test]
    async fn disabled_flag_returns_no_update() {
        let node = IntentNode::new(false, false, rules(), None);
        let mut state = GraphState::new("s1");
        state.semantic_input.text = "add 2 and 3".to_string();
        let (update, _) = node.compute(&state).await.unwrap();
        assert!(update.intent_result.is_none());
    }

    #[tokio::test]
    async fn layer1_rule_match_wins() {
        let node = IntentNode::new(true, true, rules(), None);
        let mut state = GraphState::new("s1");
        state.semantic_input.text = "please add 2 and 3".to_string();
        let (update, _) = node.compute(&state).await.unwrap();
        let result = update.intent_result.unwrap();
        assert_eq!(result.source, IntentSource::Layer1);
        assert_eq!(result.matched_rule.as_deref(), Some("math_add"));
    }

    #[tokio::test]
    async fn no_match_and_no_layer2_falls_back_to_normal() {
        let node = IntentNode::new(true, false, rules(), None);
        let state = GraphState::new("s1");
        let (update, _) = node.compute(&state).await.unwrap();
        let result = update.intent_result.unwrap();
        assert!(result.is_normal());
        assert_eq!(result.source, IntentSource::Fallback);
    }
}
