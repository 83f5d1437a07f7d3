//! Node: Image (optional entry) and the MemoryExtraction step that follows it:
//! `Image → MemoryExtraction → HITL → END`.

use super::Node;
use crate::collaborators::ocr::ImageOcrProvider;
use crate::error::Result;
use crate::events::StreamEvent;
use crate::state::{GraphState, HitlActions, HitlField, HitlRequest, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub struct ImageNode {
    ocr: Arc<dyn ImageOcrProvider>,
}

impl ImageNode {
    pub fn new(ocr: Arc<dyn ImageOcrProvider>) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl Node for ImageNode {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        let mut extracted = String::new();
        for image in &state.semantic_input.images {
            match self.ocr.extract_text(image).await {
                Ok(text) if !text.is_empty() => {
                    if !extracted.is_empty() {
                        extracted.push('\n');
                    }
                    extracted.push_str(&text);
                }
                Ok(_) => {}
                Err(err) => return Err(crate::error::GraphError::Collaborator(err.0)),
            }
        }

        let display_text = if extracted.is_empty() { "(no text found)".to_string() } else { extracted.clone() };
        let event = StreamEvent::Text { content: display_text };

        let mut semantic_input = state.semantic_input.clone();
        semantic_input.text = extracted;

        Ok((StateUpdate { semantic_input: Some(semantic_input), ..Default::default() }, vec![event]))
    }
}

/// Turns non-empty OCR text into a HITL form asking the user to confirm the memory
/// before it's persisted (`target_time`, `location`, `participants`, `key`, `value`).
/// Produces no request when the image yielded no text — the orchestrator then routes
/// straight to `END` with no HITL event.
pub struct MemoryExtractionNode;

impl MemoryExtractionNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MemoryExtractionNode {
    fn default() -> Self {
        Self::new()
    }
}

fn field(name: &str, field_type: &str, label: &str, required: bool) -> HitlField {
    HitlField {
        name: name.to_string(),
        field_type: field_type.to_string(),
        label: label.to_string(),
        required,
        options: None,
        default: None,
        min: None,
        max: None,
        step: None,
        placeholder: None,
    }
}

#[async_trait]
impl Node for MemoryExtractionNode {
    fn name(&self) -> &'static str {
        "memory_extraction"
    }

    async fn compute(&self, state: &GraphState) -> Result<(StateUpdate, Vec<StreamEvent>)> {
        if state.semantic_input.text.is_empty() {
            return Ok((StateUpdate::default(), Vec::new()));
        }

        let request = HitlRequest::Form {
            id: Uuid::new_v4().to_string(),
            title: "Save plan".to_string(),
            description: Some(format!("Save the plan extracted from the image?\n\n{}", state.semantic_input.text)),
            fields: vec![
                field("target_time", "text", "When", false),
                field("location", "text", "Where", false),
                field("participants", "text", "Who", false),
                field("key", "text", "Memory key", true),
                field("value", "textarea", "Memory value", true),
            ],
            actions: Some(HitlActions { approve: Some("Save".to_string()), edit: Some("Edit".to_string()), reject: Some("Discard".to_string()) }),
            session_id: state.session_id.clone(),
            ttl_seconds: None,
            readonly: None,
        };

        Ok((StateUpdate { hitl_request: Some(Some(request)), ..Default::default() }, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ocr::StubOcrProvider;

    #[tokio::test]
    async fn populated_ocr_sets_text_and_emits_event() {
        let node = ImageNode::new(Arc::new(StubOcrProvider::new("Meeting tomorrow 3pm with Bob")));
        let mut state = GraphState::new("s1");
        state.semantic_input.images.push(vec![1, 2, 3]);
        let (update, events) = node.compute(&state).await.unwrap();
        assert_eq!(update.semantic_input.unwrap().text, "Meeting tomorrow 3pm with Bob");
        assert!(matches!(&events[0], StreamEvent::Text { content } if content.contains("Meeting")));
    }

    #[tokio::test]
    async fn empty_ocr_emits_no_text_found() {
        let node = ImageNode::new(Arc::new(StubOcrProvider::empty()));
        let mut state = GraphState::new("s1");
        state.semantic_input.images.push(vec![]);
        let (_, events) = node.compute(&state).await.unwrap();
        assert!(matches!(&events[0], StreamEvent::Text { content } if content == "(no text found)"));
    }

    #[tokio::test]
    async fn empty_text_produces_no_hitl_request() {
        let node = MemoryExtractionNode::new();
        let state = GraphState::new("s1");
        let (update, _) = node.compute(&state).await.unwrap();
        assert!(update.hitl_request.is_none());
    }

    #[tokio::test]
    async fn nonempty_text_produces_save_plan_form() {
        let node = MemoryExtractionNode::new();
        let mut state = GraphState::new("s1");
        state.semantic_input.text = "Meeting tomorrow 3pm with Bob".to_string();
        let (update, _) = node.compute(&state).await.unwrap();
        let request = update.hitl_request.unwrap().unwrap();
        assert_eq!(request.title(), "Save plan");
    }
}
