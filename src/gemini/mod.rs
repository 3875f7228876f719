pub mod image_client;
pub mod response;

use crate::{
    config::GeminiConfig,
    error::Result,
    logger,
    models::{
        EncodedImage, GenerateContentRequest, GenerateContentResponse, GenerationOutcome,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

pub use image_client::GeminiClient;
pub use response::{interpret_response, ResponseShape};

/// Something that can answer a `generateContent` request.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// Sends one try-on request and turns whatever comes back into an outcome.
#[derive(Clone)]
pub struct TryOnClient {
    backend: Arc<dyn GenerationBackend>,
}

impl TryOnClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(GeminiClient::new(config)?)))
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub async fn generate(
        &self,
        person: &EncodedImage,
        clothing: &EncodedImage,
        prompt: &str,
    ) -> GenerationOutcome {
        let request = GenerateContentRequest::try_on(person, clothing, prompt);

        let timer = logger::timer("generateContent");
        let result = self.backend.generate_content(&request).await;
        drop(timer);

        let outcome = match result {
            Ok(response) => interpret_response(&response),
            Err(err) => GenerationOutcome::Failed(err),
        };

        match &outcome {
            GenerationOutcome::Succeeded(image) => {
                log::info!(
                    "Try-on image generated: {} ({} base64 chars)",
                    image.media_type,
                    image.data.len()
                );
            }
            GenerationOutcome::Failed(err) => {
                log::error!("Error generating virtual try-on ({}): {}", err.kind(), err);
            }
        }
        outcome
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::TryOnError;
    use serde_json::Value;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use std::time::Duration;

    /// Replays a fixed reply and remembers every request it was sent.
    pub struct ScriptedBackend {
        reply: std::result::Result<Value, TryOnError>,
        delay: Option<Duration>,
        panic: bool,
        calls: AtomicUsize,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedBackend {
        pub fn replying(body: Value) -> Self {
            Self::with_reply(Ok(body))
        }

        pub fn failing(err: TryOnError) -> Self {
            Self::with_reply(Err(err))
        }

        pub fn panicking() -> Self {
            let mut backend = Self::with_reply(Err(TryOnError::MalformedResponse));
            backend.panic = true;
            backend
        }

        fn with_reply(reply: std::result::Result<Value, TryOnError>) -> Self {
            Self {
                reply,
                delay: None,
                panic: false,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<Value> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate_content(
            &self,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.panic {
                panic!("backend exploded");
            }
            match &self.reply {
                Ok(body) => Ok(serde_json::from_value(body.clone()).unwrap()),
                Err(err) => Err(err.clone()),
            }
        }
    }

    pub fn png_reply(data: &str) -> Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": data } }
            ]}}]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{png_reply, ScriptedBackend};
    use super::*;
    use crate::error::TryOnError;

    fn images() -> (EncodedImage, EncodedImage) {
        (
            EncodedImage::new("UEVSU09O", "image/png").unwrap(),
            EncodedImage::new("Q0xPVEg=", "image/webp").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_generate_sends_ordered_parts_once() {
        let backend = Arc::new(ScriptedBackend::replying(png_reply("T1VU")));
        let client = TryOnClient::new(backend.clone());
        let (person, clothing) = images();

        let outcome = client.generate(&person, &clothing, "dress them up").await;
        assert_eq!(
            outcome.image().unwrap().to_data_uri(),
            "data:image/png;base64,T1VU"
        );
        assert_eq!(backend.calls(), 1);

        let request = backend.last_request().unwrap();
        let parts = &request["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["data"], "UEVSU09O");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/webp");
        assert_eq!(parts[2]["text"], "dress them up");
        assert_eq!(
            request["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE"])
        );
    }

    #[tokio::test]
    async fn test_backend_error_becomes_failed_outcome() {
        let backend = Arc::new(ScriptedBackend::failing(TryOnError::Auth(
            "API key not valid".into(),
        )));
        let client = TryOnClient::new(backend);
        let (person, clothing) = images();

        let outcome = client.generate(&person, &clothing, "").await;
        assert_eq!(
            outcome.message().unwrap(),
            crate::error::AUTH_MESSAGE.to_string()
        );
    }
}
