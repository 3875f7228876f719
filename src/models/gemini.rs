use serde::{Deserialize, Serialize};

use super::image::EncodedImage;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// One user turn with the parts in order: person, clothing, prompt.
    /// Only image output is requested.
    pub fn try_on(person: &EncodedImage, clothing: &EncodedImage, prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(person),
                    Part::inline(clothing),
                    Part::text(prompt),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec![Modality::Image],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Image,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(image: &EncodedImage) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.media_type().to_string(),
                data: image.data().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

impl Candidate {
    pub fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .map(|content| content.parts.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Body of a non-2xx reply: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_part_order_and_modality() {
        let person = EncodedImage::new("UEVSU09O", "image/png").unwrap();
        let clothing = EncodedImage::new("Q0xPVEg=", "image/jpeg").unwrap();
        let request = GenerateContentRequest::try_on(&person, &clothing, "put it on");

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "UEVSU09O" } },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "Q0xPVEg=" } },
                        { "text": "put it on" }
                    ]
                }],
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })
        );
    }

    #[test]
    fn test_response_accepts_snake_case_fields() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "inline_data": { "mime_type": "image/webp", "data": "AAAA" } }] }
            }],
            "prompt_feedback": { "block_reason": "OTHER" }
        }))
        .unwrap();

        let candidates = response.candidates.unwrap();
        let inline = candidates[0].parts()[0].inline_data.clone().unwrap();
        assert_eq!(inline.mime_type, "image/webp");
        assert_eq!(
            response.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("OTHER")
        );
    }

    #[test]
    fn test_candidate_without_content_has_no_parts() {
        let candidate: Candidate =
            serde_json::from_value(json!({ "finishReason": "IMAGE_SAFETY" })).unwrap();
        assert!(candidate.parts().is_empty());
        assert_eq!(candidate.finish_reason.as_deref(), Some("IMAGE_SAFETY"));
    }
}
