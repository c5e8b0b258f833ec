//! End-to-end flows composed from the pipeline stages: generate-and-search
//! for a batch of candidate designs, and the full text → image → edit →
//! search → upload workflow.

use tracing::{info, warn};

use crate::codec;
use crate::compose;
use crate::error::MaquetteResult;
use crate::generate::{DesignGenerator, GeneratorOpts};
use crate::model::{Artifact, DesignMeta, EditRequest, EditSummary, TextStyle};
use crate::store::DesignStore;
use crate::text::TextRenderer;
use crate::textgen::{self, GeneratedCopy};
use crate::upstream::{ImageGeneration, ObjectStore, TextCompletion, VectorSearch};

/// The collaborators a flow may touch. Optional collaborators degrade to
/// no-ops rather than failing the flow.
pub struct Collaborators<'a> {
    pub image_gen: &'a dyn ImageGeneration,
    pub text: Option<&'a dyn TextCompletion>,
    pub search: Option<&'a dyn VectorSearch>,
    pub object_store: Option<&'a dyn ObjectStore>,
}

/// Generate `count` fresh designs and append visually-similar past designs
/// from the search collaborator. Every returned artifact is registered in
/// the store under a fresh id; search-result identity is not preserved
/// across calls.
pub fn search_designs(
    collab: &Collaborators<'_>,
    store: &DesignStore,
    renderer: &mut TextRenderer,
    opts: GeneratorOpts,
    event_type: &str,
    theme: &str,
    count: usize,
) -> Vec<String> {
    let generator = DesignGenerator::new(collab.image_gen, collab.text, opts);
    let mut artifacts = generator.generate_batch(renderer, event_type, theme, count);

    if let Some(search) = collab.search {
        let query = format!("{event_type} {theme}");
        match search.find_similar(&query) {
            Ok(hits) => {
                for hit in hits {
                    let Some(bytes) = hit.image_bytes.as_deref() else {
                        warn!(url = %hit.url, "search hit without inline image bytes, skipping");
                        continue;
                    };
                    match codec::decode_rgba(bytes) {
                        Ok(img) => {
                            let meta = DesignMeta::search_result(event_type, theme, hit.score);
                            artifacts.push(Artifact::new(img, meta));
                        }
                        Err(e) => warn!(url = %hit.url, error = %e, "undecodable search hit"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "similarity search failed, returning generated only"),
        }
    }

    info!(total = artifacts.len(), "search-designs flow complete");
    artifacts.into_iter().map(|a| store.insert(a)).collect()
}

/// Apply an edit to a stored design, registering the result as a new
/// artifact. The parent is never mutated. Unknown parent ids surface as
/// `NotFound`.
pub fn edit_design(
    store: &DesignStore,
    renderer: &mut TextRenderer,
    parent_id: &str,
    req: &EditRequest,
) -> MaquetteResult<String> {
    let parent = store.get(parent_id)?;
    let edited = compose::apply_edits(&parent.image, req, renderer);
    let child = parent.derived(edited, EditSummary::from_request(req));
    Ok(store.insert(child))
}

/// Result of the full workflow run.
#[derive(Debug)]
pub struct WorkflowOutput {
    pub copy: GeneratedCopy,
    pub artifact_id: String,
    pub similar_count: usize,
    pub storage_handle: Option<String>,
}

/// The complete flow: generate copy, generate an image, overlay the
/// headline, search for similar designs, upload the result. Collaborator
/// failures degrade; the flow itself only fails on internal invariants.
pub fn run_workflow(
    collab: &Collaborators<'_>,
    store: &DesignStore,
    renderer: &mut TextRenderer,
    opts: GeneratorOpts,
    event_type: &str,
    theme: &str,
) -> MaquetteResult<WorkflowOutput> {
    let copy = textgen::generate_copy(collab.text, event_type, theme);

    let generator = DesignGenerator::new(collab.image_gen, collab.text, opts);
    let artifact = generator.generate_one(renderer, event_type, theme);
    let parent_id = store.insert(artifact);

    let edit = EditRequest {
        effect: None,
        text: Some(copy.headline.clone()),
        style: Some(TextStyle::default()),
        overlay: None,
    };
    let artifact_id = edit_design(store, renderer, &parent_id, &edit)?;

    let similar_count = match collab.search {
        Some(search) => match search.find_similar(&format!("{event_type} {theme}")) {
            Ok(hits) => hits.len(),
            Err(e) => {
                warn!(error = %e, "similarity search failed during workflow");
                0
            }
        },
        None => 0,
    };

    let storage_handle = match collab.object_store {
        Some(object_store) => {
            let edited = store.get(&artifact_id)?;
            let png = codec::encode_png(&edited.image)?;
            match object_store.put(&png, &edited.meta) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "design upload failed");
                    None
                }
            }
        }
        None => None,
    };

    Ok(WorkflowOutput {
        copy,
        artifact_id,
        similar_count,
        storage_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_png;
    use crate::upstream::{ImageRequest, ImageResponse, SimilarDesign};
    use std::time::Duration;

    struct AlwaysBytes(Vec<u8>);
    impl ImageGeneration for AlwaysBytes {
        fn generate(&self, _model: &str, _req: &ImageRequest) -> ImageResponse {
            ImageResponse::Bytes(self.0.clone())
        }
    }

    struct CannedSearch(Vec<SimilarDesign>);
    impl VectorSearch for CannedSearch {
        fn find_similar(&self, _query: &str) -> MaquetteResult<Vec<SimilarDesign>> {
            Ok(self.0.clone())
        }
    }

    fn opts() -> GeneratorOpts {
        GeneratorOpts {
            models: vec!["primary".into()],
            max_retries: 1,
            retry_delay: Duration::ZERO,
            width: 8,
            height: 8,
        }
    }

    fn png_fixture() -> Vec<u8> {
        encode_png(&image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([1, 2, 3, 255]),
        ))
        .unwrap()
    }

    #[test]
    fn search_designs_combines_generated_and_search_hits() {
        let gen_client = AlwaysBytes(png_fixture());
        let search = CannedSearch(vec![
            SimilarDesign {
                url: "https://example/a.png".into(),
                score: 61.0,
                payload: serde_json::Value::Null,
                image_bytes: Some(png_fixture()),
            },
            // No inline bytes: skipped.
            SimilarDesign {
                url: "https://example/b.png".into(),
                score: 48.0,
                payload: serde_json::Value::Null,
                image_bytes: None,
            },
        ]);
        let collab = Collaborators {
            image_gen: &gen_client,
            text: None,
            search: Some(&search),
            object_store: None,
        };
        let store = DesignStore::new();
        let mut renderer = TextRenderer::disabled();

        let ids = search_designs(&collab, &store, &mut renderer, opts(), "wedding", "rustic", 2);
        assert_eq!(ids.len(), 3);
        assert_eq!(store.len(), 3);

        let scores: Vec<f64> = ids
            .iter()
            .map(|id| store.get(id).unwrap().meta.similarity_score)
            .collect();
        assert_eq!(scores, vec![100.0, 100.0, 61.0]);
    }

    #[test]
    fn edit_design_never_mutates_the_parent() {
        let store = DesignStore::new();
        let parent_img = image::RgbaImage::from_pixel(4, 4, image::Rgba([100, 100, 100, 255]));
        let parent = Artifact::new(
            parent_img.clone(),
            DesignMeta::generated("wedding", "rustic", "p", "m"),
        );
        let parent_id = store.insert(parent);

        let mut renderer = TextRenderer::disabled();
        let req = EditRequest {
            effect: Some(crate::model::EffectKind::Vintage),
            text: None,
            style: None,
            overlay: None,
        };
        let child_id = edit_design(&store, &mut renderer, &parent_id, &req).unwrap();

        assert_ne!(child_id, parent_id);
        assert_eq!(store.get(&parent_id).unwrap().image, parent_img);
        let child = store.get(&child_id).unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(parent_id.as_str()));
        assert_ne!(child.image, parent_img);
        assert_eq!(
            child.edits.as_ref().unwrap().effect.as_deref(),
            Some("vintage")
        );
    }

    #[test]
    fn edit_unknown_id_surfaces_not_found() {
        let store = DesignStore::new();
        let mut renderer = TextRenderer::disabled();
        let err = edit_design(&store, &mut renderer, "missing", &EditRequest::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn workflow_produces_an_edited_artifact_with_fallback_copy() {
        let gen_client = AlwaysBytes(png_fixture());
        let collab = Collaborators {
            image_gen: &gen_client,
            text: None,
            search: None,
            object_store: None,
        };
        let store = DesignStore::new();
        let mut renderer = TextRenderer::disabled();

        let out = run_workflow(&collab, &store, &mut renderer, opts(), "wedding", "rustic").unwrap();
        assert!(out.copy.degraded);
        assert_eq!(out.similar_count, 0);
        assert!(out.storage_handle.is_none());

        let artifact = store.get(&out.artifact_id).unwrap();
        assert!(artifact.parent_id.is_some());
        assert_eq!(artifact.edits.as_ref().unwrap().text.as_deref(), Some("Rustic wedding"));
        assert_eq!(store.len(), 2);
    }
}
