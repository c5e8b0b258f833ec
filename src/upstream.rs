//! Narrow interfaces to the external collaborators: text completion, image
//! generation, vector similarity search, and the persistent object store.
//! The pipeline only ever sees these traits; concrete HTTP clients live in
//! their own modules.

use crate::error::MaquetteResult;
use crate::model::DesignMeta;

/// Parameters for one image-generation attempt.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub width: u32,
    pub height: u32,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: "low quality, blurry, bad art, text, watermark".to_string(),
            num_inference_steps: 30,
            guidance_scale: 7.5,
            width,
            height,
        }
    }
}

/// Why an attempt may be retried against the same model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryReason {
    /// Upstream accepted the request but the model is still warming up.
    ModelLoading,
    /// Transport-level failure (connect, timeout, read).
    Transport(String),
}

/// Outcome of one image-generation attempt. Replaces ad hoc status-code
/// branching with the three cases the orchestrator's state machine consumes.
#[derive(Clone, Debug)]
pub enum ImageResponse {
    Bytes(Vec<u8>),
    Retryable(RetryReason),
    /// Aborts the current model and advances to the next candidate.
    Fatal(String),
}

impl ImageResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

/// Text completion collaborator (prompt enrichment and copy generation).
pub trait TextCompletion {
    fn complete(&self, input: &str) -> MaquetteResult<String>;
}

/// Image generation collaborator. Infallible by signature: every failure
/// mode is data the state machine acts on.
pub trait ImageGeneration {
    fn generate(&self, model: &str, req: &ImageRequest) -> ImageResponse;
}

/// One ranked result from the similarity search collaborator.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SimilarDesign {
    pub url: String,
    /// Similarity in `[0, 100]`.
    pub score: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Inline image bytes when the search payload carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bytes: Option<Vec<u8>>,
}

/// Vector similarity search collaborator.
pub trait VectorSearch {
    fn find_similar(&self, query: &str) -> MaquetteResult<Vec<SimilarDesign>>;
}

/// Persistent object/metadata store collaborator.
pub trait ObjectStore {
    /// Store bytes plus metadata, returning a storage handle.
    fn put(&self, bytes: &[u8], meta: &DesignMeta) -> MaquetteResult<String>;
    /// Fetch stored bytes; unknown ids surface as `NotFound`.
    fn get(&self, id: &str, format: &str) -> MaquetteResult<Vec<u8>>;
}
