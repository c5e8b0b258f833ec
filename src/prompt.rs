use tracing::warn;

use crate::upstream::TextCompletion;

const ENRICHED_SUFFIX: &str = ", high quality, professional, detailed";
const FALLBACK_SUFFIX: &str = ", high quality, professional";

/// Base prompt form for an (event type, theme) pair.
pub fn base_prompt(event_type: &str, theme: &str) -> String {
    format!("Create a {theme} design for a {event_type} event:")
}

/// Build the image-generation prompt, enriched by the text collaborator
/// when reachable. Enrichment failure is silent to the caller: it is logged
/// and the base form is used instead.
pub fn build(enrichment: Option<&dyn TextCompletion>, event_type: &str, theme: &str) -> String {
    let base = base_prompt(event_type, theme);

    if let Some(client) = enrichment {
        match client.complete(&base) {
            Ok(text) if !text.trim().is_empty() => {
                return format!("{}{ENRICHED_SUFFIX}", text.trim());
            }
            Ok(_) => warn!("prompt enrichment returned empty text, using base prompt"),
            Err(e) => warn!(error = %e, "prompt enrichment failed, using base prompt"),
        }
    }

    format!("{base}{FALLBACK_SUFFIX}")
}
