use async_trait::async_trait;
use serde::Deserialize;

use crate::config::VisionSettings;
use crate::errors::{ScreenPilotError, ScreenPilotResult};
use crate::types::{AnalysisResult, ElementLocation, ElementType, ImageInput};
use crate::vision::provider::VisionProvider;

const DESCRIBE_SYSTEM_PROMPT: &str = "\
You are a UI analysis expert. Analyze the screenshot and provide:

1. A detailed description of what's visible on screen
2. A list of interactive elements (buttons, inputs, links, etc.) with their locations

Return JSON:
{
    \"description\": \"Detailed description of the screen...\",
    \"elements\": [
        {
            \"description\": \"Element description\",
            \"type\": \"button|input|link|text|image|icon|other\",
            \"x\": 100,
            \"y\": 200,
            \"width\": 80,
            \"height\": 30,
            \"confidence\": 0.9
        }
    ],
    \"text_content\": [\"visible text 1\", \"visible text 2\"]
}

Coordinates are pixels in the supplied image, (0,0) at top-left.";

const LOCATE_SYSTEM_PROMPT: &str = "\
You are a UI element locator. Find the element described by the user.

Return JSON:
{
    \"found\": true/false,
    \"description\": \"What you found\",
    \"type\": \"button|input|link|text|image|icon|other\",
    \"x\": <x coordinate of center>,
    \"y\": <y coordinate of center>,
    \"width\": <estimated width>,
    \"height\": <estimated height>,
    \"confidence\": <0.0-1.0>
}

Coordinates are pixels in the supplied image, (0,0) at top-left.
If you can't find the element, set found=false and explain in description.";

/// Vision calls against any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiVisionProvider {
    settings: VisionSettings,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiVisionProvider {
    pub fn new(settings: VisionSettings) -> ScreenPilotResult<Self> {
        let api_key = settings.resolve_api_key()?;
        Ok(Self {
            settings,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_text: &str,
        image: &ImageInput,
    ) -> ScreenPilotResult<String> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": user_text },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", image.media_type, image.base64)
                            }
                        }
                    ]
                }
            ],
        });

        tracing::debug!(
            model = %self.settings.model,
            width = image.meta.width,
            height = image.meta.height,
            "sending vision request (base64 payload omitted)"
        );

        let response = self
            .client
            .post(&self.settings.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(ScreenPilotError::VisionProvider(format!(
                "{status}: {err_body}"
            )));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ScreenPilotError::VisionProvider("response had no choices".into()))
    }
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn describe(&self, image: &ImageInput) -> ScreenPilotResult<AnalysisResult> {
        let content = self
            .chat(DESCRIBE_SYSTEM_PROMPT, "Analyze this screenshot:", image)
            .await?;
        parse_describe(&content, image)
    }

    async fn locate(
        &self,
        description: &str,
        image: &ImageInput,
    ) -> ScreenPilotResult<Option<ElementLocation>> {
        let content = self
            .chat(
                LOCATE_SYSTEM_PROMPT,
                &format!("Find this element: {description}"),
                image,
            )
            .await?;
        parse_locate(&content, description, image)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct DescribePayload {
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<ElementPayload>,
    #[serde(default)]
    text_content: Vec<String>,
}

#[derive(Deserialize)]
struct ElementPayload {
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    element_type: Option<String>,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct LocatePayload {
    #[serde(default)]
    found: bool,
    #[serde(flatten)]
    element: ElementPayload,
}

fn parse_element_type(raw: Option<&str>) -> ElementType {
    match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("button") => ElementType::Button,
        Some("input") => ElementType::Input,
        Some("link") => ElementType::Link,
        Some("text") => ElementType::Text,
        Some("image") => ElementType::Image,
        Some("icon") => ElementType::Icon,
        _ => ElementType::Other,
    }
}

/// Builds an [`ElementLocation`] out of the raw payload, holding its
/// invariants: confidence clamped to [0, 1], coordinates inside the image.
fn element_from_payload(
    payload: ElementPayload,
    fallback_description: &str,
    image: &ImageInput,
) -> ScreenPilotResult<ElementLocation> {
    if payload.x < 0
        || payload.y < 0
        || payload.x >= image.meta.width as i32
        || payload.y >= image.meta.height as i32
    {
        return Err(ScreenPilotError::VisionParse(format!(
            "element coordinates ({}, {}) outside {}x{} image",
            payload.x, payload.y, image.meta.width, image.meta.height
        )));
    }

    let description = if payload.description.is_empty() {
        fallback_description.to_string()
    } else {
        payload.description
    };

    Ok(ElementLocation {
        description,
        element_type: parse_element_type(payload.element_type.as_deref()),
        x: payload.x,
        y: payload.y,
        width: payload.width,
        height: payload.height,
        confidence: payload.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
    })
}

/// Models sometimes wrap the JSON body in a markdown fence despite the
/// json_object response format; strip it before parsing.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_describe(content: &str, image: &ImageInput) -> ScreenPilotResult<AnalysisResult> {
    let payload: DescribePayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ScreenPilotError::VisionParse(format!("describe response: {e}")))?;

    let mut elements = Vec::with_capacity(payload.elements.len());
    for el in payload.elements {
        match element_from_payload(el, "", image) {
            Ok(el) => elements.push(el),
            // One bad element should not throw away the whole analysis.
            Err(e) => tracing::warn!(error = %e, "skipping malformed element"),
        }
    }

    Ok(AnalysisResult {
        description: payload.description,
        elements,
        text_content: payload.text_content,
    })
}

fn parse_locate(
    content: &str,
    description: &str,
    image: &ImageInput,
) -> ScreenPilotResult<Option<ElementLocation>> {
    let payload: LocatePayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ScreenPilotError::VisionParse(format!("locate response: {e}")))?;

    if !payload.found {
        return Ok(None);
    }
    element_from_payload(payload.element, description, image).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScreenshotMeta;

    fn image() -> ImageInput {
        ImageInput {
            base64: String::new(),
            media_type: "image/png".into(),
            meta: ScreenshotMeta {
                width: 1920,
                height: 1080,
            },
        }
    }

    #[test]
    fn locate_parses_found_element() {
        let content = r#"{"found": true, "description": "blue submit button", "type": "button",
                          "x": 640, "y": 480, "width": 80, "height": 30, "confidence": 0.92}"#;
        let el = parse_locate(content, "submit", &image()).unwrap().unwrap();
        assert_eq!(el.coordinates(), (640, 480));
        assert_eq!(el.element_type, ElementType::Button);
        assert!((el.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn locate_not_found_is_none() {
        let content = r#"{"found": false, "description": "no such element"}"#;
        assert!(parse_locate(content, "submit", &image()).unwrap().is_none());
    }

    #[test]
    fn locate_garbage_is_parse_error() {
        let err = parse_locate("the button is near the top", "submit", &image()).unwrap_err();
        assert!(matches!(err, ScreenPilotError::VisionParse(_)));
    }

    #[test]
    fn locate_rejects_coordinates_outside_image() {
        let content = r#"{"found": true, "x": 5000, "y": 100, "confidence": 0.9}"#;
        let err = parse_locate(content, "submit", &image()).unwrap_err();
        assert!(matches!(err, ScreenPilotError::VisionParse(_)));
    }

    #[test]
    fn confidence_is_clamped_into_unit_range() {
        let content = r#"{"found": true, "x": 10, "y": 10, "confidence": 1.7}"#;
        let el = parse_locate(content, "submit", &image()).unwrap().unwrap();
        assert!((el.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn describe_skips_malformed_elements_but_keeps_good_ones() {
        let content = r#"{
            "description": "a login page",
            "elements": [
                {"description": "ok button", "type": "button", "x": 100, "y": 100},
                {"description": "ghost", "type": "button", "x": -5, "y": 100}
            ],
            "text_content": ["Login"]
        }"#;
        let result = parse_describe(content, &image()).unwrap();
        assert_eq!(result.elements.len(), 1);
        assert_eq!(result.text_content, vec!["Login".to_string()]);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let content = "```json\n{\"found\": false}\n```";
        assert!(parse_locate(content, "x", &image()).unwrap().is_none());
    }

    #[test]
    fn unknown_element_type_falls_back_to_other() {
        let content = r#"{"found": true, "type": "hologram", "x": 10, "y": 10}"#;
        let el = parse_locate(content, "x", &image()).unwrap().unwrap();
        assert_eq!(el.element_type, ElementType::Other);
    }
}
