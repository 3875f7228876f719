use crate::{
    error::TryOnError,
    models::{GenerateContentResponse, GeneratedImage, GenerationOutcome, InlineData},
};

/// What a `generateContent` reply amounts to. Variants are listed in the
/// order they are checked; the first that applies wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape<'a> {
    Blocked(&'a str),
    NoCandidate,
    Image(&'a InlineData),
    Text(&'a str),
    Unrecognized,
}

impl<'a> ResponseShape<'a> {
    pub fn of(response: &'a GenerateContentResponse) -> Self {
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
            .filter(|reason| !reason.is_empty());
        let candidate = response
            .candidates
            .as_deref()
            .and_then(|candidates| candidates.first());
        let image = candidate.and_then(|candidate| {
            candidate
                .parts()
                .iter()
                .find_map(|part| {
                    part.inline_data
                        .as_ref()
                        .filter(|inline| !inline.data.is_empty() && !inline.mime_type.is_empty())
                })
        });
        let text = candidate.and_then(|candidate| {
            candidate
                .parts()
                .iter()
                .find_map(|part| part.text.as_deref().filter(|text| !text.is_empty()))
        });

        match (block_reason, candidate, image, text) {
            (Some(reason), _, _, _) => ResponseShape::Blocked(reason),
            (None, None, _, _) => ResponseShape::NoCandidate,
            (None, Some(_), Some(inline), _) => ResponseShape::Image(inline),
            (None, Some(_), None, Some(text)) => ResponseShape::Text(text),
            (None, Some(_), None, None) => ResponseShape::Unrecognized,
        }
    }
}

pub fn interpret_response(response: &GenerateContentResponse) -> GenerationOutcome {
    match ResponseShape::of(response) {
        ResponseShape::Blocked(reason) => {
            GenerationOutcome::Failed(TryOnError::Blocked(reason.to_string()))
        }
        ResponseShape::NoCandidate => GenerationOutcome::Failed(TryOnError::EmptyResponse),
        ResponseShape::Image(inline) => GenerationOutcome::Succeeded(GeneratedImage {
            media_type: inline.mime_type.clone(),
            data: inline.data.clone(),
        }),
        ResponseShape::Text(text) => {
            GenerationOutcome::Failed(TryOnError::UnexpectedText(text.to_string()))
        }
        ResponseShape::Unrecognized => GenerationOutcome::Failed(TryOnError::MalformedResponse),
    }
}
