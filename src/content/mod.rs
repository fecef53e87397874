//! Generated listing content: key rotation, the generative API client, and form filling

pub mod fill;
pub mod gemini;
pub mod generator;
pub mod rotation;

pub use fill::{ContentFillEngine, FillReport, FillTarget, FillTimings};
pub use gemini::{DEFAULT_MODEL, GeminiClient, GeneratedContent, ImageData};
pub use generator::{ContentGenerator, DEFAULT_PROMPT};
pub use rotation::{AttemptFailure, KeyRotationClient, Rotation, StartOffset, mask_key};
