//! Node: Emotion. Keyword-based detector with a neutral fallback; emits an
//! `emotion` event immediately (the only node besides Reasoning that emits inline).

use super::Node;
use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{EmotionalContext, GraphState, StateUpdate};
use async_trait::async_trait;

struct EmotionSignal {
    label: &'static str,
    keywords: &'static [&'static str],
    modulation: &'static str,
}

const SIGNALS: &[EmotionSignal] = &[
    EmotionSignal { label: "joy", keywords: &["great", "awesome", "thanks", "love", "happy"], modulation: "Respond warmly and share in the user's enthusiasm." },
    EmotionSignal { label: "frustration", keywords: &["ugh", "annoying", "broken", "hate", "stupid"], modulation: "Acknowledge the frustration before addressing the request." },
    EmotionSignal { label: "sadness", keywords: &["sad", "sorry", "upset", "down"], modulation: "Respond gently and with empathy." },
    EmotionSignal { label: "anxiety", keywords: &["worried", "anxious", "nervous", "scared"], modulation: "Respond calmly and reassuringly." },
];

pub struct EmotionNode;

impl EmotionNode {
    pub fn new() -> Self {
        Self
    }

    fn detect(text: &str) -> EmotionalContext {
        let lower = text.to_lowercase();
        for signal in SIGNALS {
            if signal.keywords.iter().any(|kw| lower.contains(kw)) {
                return EmotionalContext {
                    current_emotion: signal.label.to_string(),
                    confidence: 0.7,
                    modulation_instruction: signal.modulation.to_string(),
                };
            }
        }
        EmotionalContext::default()
    }
}

impl Default for EmotionNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for EmotionNode {
    fn name(&self) -> &'static str {
        "emotion"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let context = Self::detect(&state.semantic_input.text);
        let event = StreamEvent::Emotion {
            primary: context.current_emotion.clone(),
            category: context.current_emotion.clone(),
            confidence: context.confidence,
        };
        Ok((StateUpdate { emotional_context: Some(context), ..Default::default() }, vec![event]))
    }
}
