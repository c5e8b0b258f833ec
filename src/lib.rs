//! Maquette generates event design artifacts: it builds prompts for
//! third-party inference APIs, retries across model candidates, degrades
//! gracefully to synthetic placeholders, and post-processes results with
//! pixel effects, text overlays, and image composition.
//!
//! The public API is pipeline-oriented:
//!
//! - Configure collaborators from the environment ([`Config`])
//! - Drive generation through a [`DesignGenerator`] or the flows in
//!   [`workflow`]
//! - Keep results in a [`DesignStore`] and edit them into new artifacts
#![forbid(unsafe_code)]

pub mod codec;
pub mod compose;
pub mod config;
pub mod effects;
pub mod error;
pub mod generate;
pub mod hf;
pub mod model;
pub mod placeholder;
pub mod prompt;
pub mod qdrant;
pub mod storage;
pub mod store;
pub mod styler;
pub mod text;
pub mod textgen;
pub mod upstream;
pub mod workflow;

pub use config::Config;
pub use error::{MaquetteError, MaquetteResult};
pub use generate::{DesignGenerator, GeneratorOpts};
pub use model::{
    Artifact, ArtifactRecord, DesignMeta, EditRequest, EditSummary, EffectKind, OverlayAnchor,
    OverlaySpec, Rgba8, TextPosition, TextStyle,
};
pub use store::DesignStore;
pub use text::TextRenderer;
pub use upstream::{
    ImageGeneration, ImageRequest, ImageResponse, ObjectStore, RetryReason, SimilarDesign,
    TextCompletion, VectorSearch,
};
