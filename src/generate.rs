//! The generation orchestrator: prompt construction, retry/fallback across
//! ordered model candidates, and graceful degradation to placeholders.
//!
//! Per requested artifact the flow is a small state machine: try each model
//! candidate in order with a bounded attempt budget; a warming-up response
//! retries the same model with an increasing delay, a transport failure
//! retries with a fixed delay, any other failure advances to the next
//! candidate. Only when every candidate is exhausted does the artifact
//! degrade to a synthetic placeholder, so callers always receive an artifact.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::codec::decode_rgba;
use crate::config::Config;
use crate::model::{Artifact, DesignMeta};
use crate::placeholder;
use crate::prompt;
use crate::text::TextRenderer;
use crate::upstream::{ImageGeneration, ImageRequest, ImageResponse, RetryReason, TextCompletion};

#[derive(Clone, Debug)]
pub struct GeneratorOpts {
    /// Ordered model candidates: primary first.
    pub models: Vec<String>,
    /// Attempt budget per model.
    pub max_retries: u32,
    /// Base delay between attempts; warm-up retries scale it by the attempt
    /// number, transport retries use it as-is.
    pub retry_delay: Duration,
    pub width: u32,
    pub height: u32,
}

impl Default for GeneratorOpts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GeneratorOpts {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            models: cfg.model_candidates(),
            max_retries: cfg.max_retries,
            retry_delay: cfg.retry_delay,
            width: 512,
            height: 512,
        }
    }
}

/// Outcome of the per-artifact state machine before post-processing.
enum Generated {
    Upstream { bytes: Vec<u8>, model: String },
    Exhausted,
}

pub struct DesignGenerator<'a> {
    image_gen: &'a dyn ImageGeneration,
    enrichment: Option<&'a dyn TextCompletion>,
    opts: GeneratorOpts,
}

impl<'a> DesignGenerator<'a> {
    pub fn new(
        image_gen: &'a dyn ImageGeneration,
        enrichment: Option<&'a dyn TextCompletion>,
        opts: GeneratorOpts,
    ) -> Self {
        Self {
            image_gen,
            enrichment,
            opts,
        }
    }

    /// Generate one artifact for `(event_type, theme)`. Never fails: total
    /// upstream failure degrades to a captioned-gradient placeholder.
    pub fn generate_one(
        &self,
        text: &mut TextRenderer,
        event_type: &str,
        theme: &str,
    ) -> Artifact {
        let prompt = prompt::build(self.enrichment, event_type, theme);
        let req = ImageRequest::new(prompt.clone(), self.opts.width, self.opts.height);

        match self.run_state_machine(&req) {
            Generated::Upstream { bytes, model } => {
                self.finish_generated(event_type, theme, &prompt, &model, &bytes)
                    .unwrap_or_else(|| self.gradient_placeholder(text, event_type, theme, &prompt))
            }
            Generated::Exhausted => self.gradient_placeholder(text, event_type, theme, &prompt),
        }
    }

    /// Generate a batch of `count` artifacts. Each artifact runs the state
    /// machine independently; one artifact's exhaustion does not abort its
    /// siblings. A batch with zero upstream successes is replaced wholesale
    /// by palette-indexed solid placeholders.
    pub fn generate_batch(
        &self,
        text: &mut TextRenderer,
        event_type: &str,
        theme: &str,
        count: usize,
    ) -> Vec<Artifact> {
        if count == 0 {
            return Vec::new();
        }

        let prompt = prompt::build(self.enrichment, event_type, theme);
        let req = ImageRequest::new(prompt.clone(), self.opts.width, self.opts.height);

        let mut finished = Vec::<Option<Artifact>>::with_capacity(count);
        for i in 0..count {
            let artifact = match self.run_state_machine(&req) {
                Generated::Upstream { bytes, model } => {
                    self.finish_generated(event_type, theme, &prompt, &model, &bytes)
                }
                Generated::Exhausted => None,
            };
            if artifact.is_some() {
                debug!(index = i, "batch artifact generated");
            } else {
                warn!(index = i, "batch artifact exhausted all model candidates");
            }
            finished.push(artifact);
        }

        if finished.iter().all(Option::is_none) {
            info!(count, "no upstream generations succeeded, using solid placeholders");
            return (0..count)
                .map(|i| {
                    let img = placeholder::solid(self.opts.width, self.opts.height, i);
                    Artifact::new(img, DesignMeta::placeholder(event_type, theme, &prompt))
                })
                .collect();
        }

        finished
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| self.gradient_placeholder(text, event_type, theme, &prompt))
            })
            .collect()
    }

    /// Try every model candidate in order with the per-model attempt budget.
    fn run_state_machine(&self, req: &ImageRequest) -> Generated {
        for model in &self.opts.models {
            for attempt in 1..=self.opts.max_retries.max(1) {
                debug!(model, attempt, "requesting image generation");
                match self.image_gen.generate(model, req) {
                    ImageResponse::Bytes(bytes) => {
                        info!(model, attempt, "image generation succeeded");
                        return Generated::Upstream {
                            bytes,
                            model: model.clone(),
                        };
                    }
                    ImageResponse::Retryable(RetryReason::ModelLoading) => {
                        debug!(model, attempt, "model is warming up");
                        if attempt < self.opts.max_retries {
                            std::thread::sleep(self.opts.retry_delay * attempt);
                        }
                    }
                    ImageResponse::Retryable(RetryReason::Transport(e)) => {
                        warn!(model, attempt, error = %e, "transport failure");
                        if attempt < self.opts.max_retries {
                            std::thread::sleep(self.opts.retry_delay);
                        }
                    }
                    ImageResponse::Fatal(e) => {
                        warn!(model, attempt, error = %e, "model failed, advancing to next candidate");
                        break;
                    }
                }
            }
        }
        Generated::Exhausted
    }

    /// Decode upstream bytes into a finished artifact. Undecodable payloads
    /// count as a failed generation.
    fn finish_generated(
        &self,
        event_type: &str,
        theme: &str,
        prompt: &str,
        model: &str,
        bytes: &[u8],
    ) -> Option<Artifact> {
        match decode_rgba(bytes) {
            Ok(img) => Some(Artifact::new(
                img,
                DesignMeta::generated(event_type, theme, prompt, model),
            )),
            Err(e) => {
                warn!(model, error = %e, "upstream returned undecodable image bytes");
                None
            }
        }
    }

    fn gradient_placeholder(
        &self,
        text: &mut TextRenderer,
        event_type: &str,
        theme: &str,
        prompt: &str,
    ) -> Artifact {
        let img = placeholder::captioned_gradient(self.opts.width, self.opts.height, prompt, text);
        Artifact::new(img, DesignMeta::placeholder(event_type, theme, prompt))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::codec::encode_png;
    use crate::placeholder::PALETTE;

    fn opts(models: &[&str]) -> GeneratorOpts {
        GeneratorOpts {
            models: models.iter().map(|m| m.to_string()).collect(),
            max_retries: 3,
            retry_delay: Duration::ZERO,
            width: 16,
            height: 16,
        }
    }

    fn png_fixture() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([12, 34, 56, 255]));
        encode_png(&img).unwrap()
    }

    /// Scripted collaborator: plays back responses in order and records the
    /// (model, attempt) sequence. An exhausted script repeats its last entry.
    struct Scripted {
        script: Mutex<Vec<ImageResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(script: Vec<ImageResponse>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always(resp: ImageResponse) -> Self {
            Self::new(vec![resp])
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ImageGeneration for Scripted {
        fn generate(&self, model: &str, _req: &ImageRequest) -> ImageResponse {
            self.calls.lock().unwrap().push(model.to_string());
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }
    }

    #[test]
    fn success_on_first_attempt_carries_model_metadata() {
        let gen_client = Scripted::always(ImageResponse::Bytes(png_fixture()));
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let artifact = generator.generate_one(&mut text, "wedding", "rustic");
        assert!(!artifact.meta.is_placeholder);
        assert_eq!(artifact.meta.model.as_deref(), Some("primary"));
        assert_eq!(artifact.meta.similarity_score, 100.0);
        assert_eq!(artifact.image.dimensions(), (4, 4));
        assert_eq!(gen_client.calls(), vec!["primary"]);
    }

    #[test]
    fn fatal_advances_to_fallback_model() {
        let gen_client = Scripted::new(vec![
            ImageResponse::Fatal("401".into()),
            ImageResponse::Bytes(png_fixture()),
        ]);
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let artifact = generator.generate_one(&mut text, "wedding", "rustic");
        assert_eq!(artifact.meta.model.as_deref(), Some("fallback"));
        assert_eq!(gen_client.calls(), vec!["primary", "fallback"]);
    }

    #[test]
    fn loading_retries_same_model_up_to_budget_then_advances() {
        let gen_client = Scripted::always(ImageResponse::Retryable(RetryReason::ModelLoading));
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let artifact = generator.generate_one(&mut text, "wedding", "rustic");
        assert!(artifact.meta.is_placeholder);
        assert_eq!(artifact.meta.similarity_score, 0.0);
        assert_eq!(
            gen_client.calls(),
            vec!["primary", "primary", "primary", "fallback", "fallback", "fallback"]
        );
    }

    #[test]
    fn transport_failure_retries_then_succeeds() {
        let gen_client = Scripted::new(vec![
            ImageResponse::Retryable(RetryReason::Transport("connect reset".into())),
            ImageResponse::Bytes(png_fixture()),
        ]);
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let artifact = generator.generate_one(&mut text, "wedding", "rustic");
        assert_eq!(artifact.meta.model.as_deref(), Some("primary"));
        assert_eq!(gen_client.calls(), vec!["primary", "primary"]);
    }

    #[test]
    fn exhausted_batch_becomes_palette_solid_placeholders() {
        let gen_client = Scripted::always(ImageResponse::Retryable(RetryReason::ModelLoading));
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let batch = generator.generate_batch(&mut text, "wedding", "rustic", 5);
        assert_eq!(batch.len(), 5);
        for (i, artifact) in batch.iter().enumerate() {
            assert!(artifact.meta.is_placeholder);
            assert_eq!(artifact.meta.similarity_score, 0.0);
            let expected = PALETTE[i % PALETTE.len()];
            assert_eq!(
                artifact.image.get_pixel(0, 0).0,
                [expected.r, expected.g, expected.b, 255]
            );
        }
        // Five independent state machines, each exhausting both candidates.
        assert_eq!(gen_client.calls().len(), 5 * 2 * 3);
    }

    #[test]
    fn mixed_batch_keeps_generated_and_gradient_placeholders() {
        // First artifact fails hard on both candidates, the rest succeed.
        let gen_client = Scripted::new(vec![
            ImageResponse::Fatal("500".into()),
            ImageResponse::Fatal("500".into()),
            ImageResponse::Bytes(png_fixture()),
        ]);
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary", "fallback"]));
        let mut text = TextRenderer::disabled();

        let batch = generator.generate_batch(&mut text, "wedding", "rustic", 3);
        assert_eq!(batch.len(), 3);

        assert!(batch[0].meta.is_placeholder);
        // Gradient placeholder, not a palette solid: top row is warm.
        assert_eq!(batch[0].image.get_pixel(0, 0).0, [255, 200, 0, 255]);

        assert!(!batch[1].meta.is_placeholder);
        assert!(!batch[2].meta.is_placeholder);
        assert_eq!(batch[1].meta.model.as_deref(), Some("primary"));
    }

    #[test]
    fn zero_count_batch_is_empty() {
        let gen_client = Scripted::always(ImageResponse::Bytes(png_fixture()));
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary"]));
        let mut text = TextRenderer::disabled();
        assert!(generator.generate_batch(&mut text, "e", "t", 0).is_empty());
        assert!(gen_client.calls().is_empty());
    }

    #[test]
    fn undecodable_bytes_degrade_to_placeholder() {
        let gen_client = Scripted::always(ImageResponse::Bytes(b"not a png".to_vec()));
        let generator = DesignGenerator::new(&gen_client, None, opts(&["primary"]));
        let mut text = TextRenderer::disabled();

        let artifact = generator.generate_one(&mut text, "wedding", "rustic");
        assert!(artifact.meta.is_placeholder);
    }
}
