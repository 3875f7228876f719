pub mod config;
pub mod encoder;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod render;
#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, GeminiConfig};
pub use encoder::ImageEncoder;
pub use error::{Result, TryOnError};
pub use gemini::{GeminiClient, GenerationBackend, TryOnClient};
pub use models::{EncodedImage, GeneratedImage, GenerationOutcome};
pub use orchestrator::{RequestState, Slot, Studio};
pub use render::ResultView;
