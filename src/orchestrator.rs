//! The studio: two image slots, a prompt, and the lifecycle of one
//! generation request at a time.
//!
//! State only moves through the methods on [`Studio`]. A generation is split
//! into [`Studio::begin_generation`] and [`Studio::finish_generation`] so a
//! caller sharing the studio behind a lock can release it while the remote
//! call is in flight.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;

use crate::{
    encoder::ImageEncoder,
    error::{Result, TryOnError},
    gemini::TryOnClient,
    models::{EncodedImage, GeneratedImage, GenerationOutcome},
};

pub const DEFAULT_PROMPT: &str = "Combine the two images. Place the clothing item from the second image onto the person in the first image, creating a realistic \"virtual try-on\" look. Maintain the original background and the person's pose.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load image. Please try another file.";
pub const MISSING_IMAGES_MESSAGE: &str = "Please upload both a person and a clothing image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Person,
    Clothing,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Person => "person",
            Slot::Clothing => "clothing",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(Slot::Person),
            "clothing" => Ok(Slot::Clothing),
            other => Err(TryOnError::Validation(format!(
                "Unknown image slot {:?}; expected \"person\" or \"clothing\".",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Loading,
    Succeeded(GeneratedImage),
    Failed(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }
}

/// Everything one generation needs, detached from the studio.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub person: EncodedImage,
    pub clothing: EncodedImage,
    pub prompt: String,
}

impl GenerationJob {
    /// Runs the request. A panic inside the client becomes a failed outcome.
    pub async fn run(self, client: &TryOnClient) -> GenerationOutcome {
        let call = client.generate(&self.person, &self.clothing, &self.prompt);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Generation client panicked");
                GenerationOutcome::Failed(TryOnError::Internal(
                    "generation client panicked".into(),
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioSnapshot {
    pub state: RequestState,
    pub person: Option<String>,
    pub clothing: Option<String>,
    pub prompt: String,
    pub can_generate: bool,
}

#[derive(Debug, Clone)]
pub struct Studio {
    encoder: ImageEncoder,
    person: Option<EncodedImage>,
    clothing: Option<EncodedImage>,
    prompt: String,
    state: RequestState,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(ImageEncoder::default())
    }
}

impl Studio {
    pub fn new(encoder: ImageEncoder) -> Self {
        Self {
            encoder,
            person: None,
            clothing: None,
            prompt: DEFAULT_PROMPT.to_string(),
            state: RequestState::Idle,
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self, slot: Slot) -> Option<&EncodedImage> {
        match slot {
            Slot::Person => self.person.as_ref(),
            Slot::Clothing => self.clothing.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<EncodedImage> {
        match slot {
            Slot::Person => &mut self.person,
            Slot::Clothing => &mut self.clothing,
        }
    }

    /// Whether the generate action is enabled.
    pub fn can_generate(&self) -> bool {
        self.person.is_some() && self.clothing.is_some() && !self.state.is_loading()
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        StudioSnapshot {
            state: self.state.clone(),
            person: self.person.as_ref().map(|image| image.media_type().to_string()),
            clothing: self
                .clothing
                .as_ref()
                .map(|image| image.media_type().to_string()),
            prompt: self.prompt.clone(),
            can_generate: self.can_generate(),
        }
    }

    /// Stores the encoded upload in `slot`. On failure the slot keeps its
    /// previous image and the state becomes `Failed`, unless a request is in
    /// flight.
    pub fn select_image(&mut self, slot: Slot, bytes: &[u8], hint: Option<&str>) -> Result<()> {
        let encoded = self.encoder.encode_bytes(bytes, hint);
        self.store_upload(slot, encoded)
    }

    pub async fn select_image_file(&mut self, slot: Slot, path: impl AsRef<Path>) -> Result<()> {
        let encoded = self.encoder.encode_file(path).await;
        self.store_upload(slot, encoded)
    }

    /// Records the result of loading an upload for `slot`.
    pub(crate) fn store_upload(&mut self, slot: Slot, encoded: Result<EncodedImage>) -> Result<()> {
        match encoded {
            Ok(image) => {
                log::info!("Loaded {} image ({})", slot, image.media_type());
                *self.slot_mut(slot) = Some(image);
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to load {} image: {}", slot, err);
                if !self.state.is_loading() {
                    self.state = RequestState::Failed(LOAD_FAILED_MESSAGE.to_string());
                }
                Err(err)
            }
        }
    }

    pub fn clear_slot(&mut self, slot: Slot) {
        *self.slot_mut(slot) = None;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// `Ok(None)` while a request is already in flight: the trigger is a no-op.
    /// Missing images are refused with a validation error and no state change.
    pub fn begin_generation(&mut self) -> Result<Option<GenerationJob>> {
        if self.state.is_loading() {
            log::warn!("Generation already in progress; ignoring trigger");
            return Ok(None);
        }
        let (Some(person), Some(clothing)) = (&self.person, &self.clothing) else {
            return Err(TryOnError::Validation(MISSING_IMAGES_MESSAGE.to_string()));
        };

        let job = GenerationJob {
            person: person.clone(),
            clothing: clothing.clone(),
            prompt: self.prompt.clone(),
        };
        self.state = RequestState::Loading;
        Ok(Some(job))
    }

    pub fn finish_generation(&mut self, outcome: GenerationOutcome) {
        if !self.state.is_loading() {
            log::warn!("Generation finished while not loading");
        }
        self.state = match outcome {
            GenerationOutcome::Succeeded(image) => RequestState::Succeeded(image),
            GenerationOutcome::Failed(err) => RequestState::Failed(err.user_message()),
        };
    }

    /// Runs one generation to completion. Returns `false` if a request was
    /// already in flight.
    pub async fn generate(&mut self, client: &TryOnClient) -> Result<bool> {
        let Some(job) = self.begin_generation()? else {
            return Ok(false);
        };
        let outcome = job.run(client).await;
        self.finish_generation(outcome);
        Ok(true)
    }
}

pub type SharedStudio = Arc<tokio::sync::Mutex<Studio>>;

/// [`Studio::generate`] for a studio shared between handlers. The lock is not
/// held across the remote call.
pub async fn generate_shared(studio: &SharedStudio, client: &TryOnClient) -> Result<bool> {
    let job = studio.lock().await.begin_generation()?;
    let Some(job) = job else {
        return Ok(false);
    };
    let outcome = job.run(client).await;
    studio.lock().await.finish_generation(outcome);
    Ok(true)
}
