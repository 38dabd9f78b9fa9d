use serde::{Deserialize, Serialize};

use crate::errors::ActionFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Button,
    Input,
    Link,
    Text,
    Image,
    Icon,
    Other,
}

impl Default for ElementType {
    fn default() -> Self {
        ElementType::Other
    }
}

/// A UI element located by the vision model. Coordinates are the element
/// centre in pixels, origin top-left of the source image. Immutable once
/// parsed out of a model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementLocation {
    pub description: String,
    #[serde(default)]
    pub element_type: ElementType,
    pub x: i32,
    pub y: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Always within [0.0, 1.0]; clamped at parse time.
    pub confidence: f32,
}

impl ElementLocation {
    pub fn coordinates(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Result of a whole-screen analysis. Element order is the model's
/// detection order and carries no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub description: String,
    #[serde(default)]
    pub elements: Vec<ElementLocation>,
    #[serde(default)]
    pub text_content: Vec<String>,
}

impl AnalysisResult {
    /// Substring match against element descriptions, first hit wins.
    pub fn find_element(&self, description: &str) -> Option<&ElementLocation> {
        let needle = description.to_lowercase();
        self.elements
            .iter()
            .find(|el| el.description.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenshotMeta {
    pub width: u32,
    pub height: u32,
}

/// A decodable image handed to the vision provider: base64 payload plus
/// the dimensions and media type needed to build and validate a request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub base64: String,
    pub media_type: String,
    pub meta: ScreenshotMeta,
}

/// Outcome of one primitive action or one interpreted command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    /// What was asked: the primitive signature, or the original
    /// instruction text once an interpreted command resolves.
    pub action: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionFailure>,
}

impl ActionResult {
    pub fn ok(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: true,
            action: action.into(),
            details: details.into(),
            error: None,
        }
    }

    pub fn failed(action: impl Into<String>, failure: ActionFailure) -> Self {
        Self {
            success: false,
            action: action.into(),
            details: failure.message.clone(),
            error: Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_element_matches_case_insensitively() {
        let result = AnalysisResult {
            description: "login form".into(),
            elements: vec![ElementLocation {
                description: "Submit Button".into(),
                element_type: ElementType::Button,
                x: 100,
                y: 200,
                width: None,
                height: None,
                confidence: 0.9,
            }],
            text_content: vec![],
        };
        assert!(result.find_element("submit").is_some());
        assert!(result.find_element("cancel").is_none());
    }
}
