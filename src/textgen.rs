//! Structured event copy (headline, tagline, description) from the text
//! collaborator, with deterministic fallbacks so callers always get usable
//! strings.

use tracing::warn;

use crate::upstream::TextCompletion;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedCopy {
    pub headline: String,
    pub tagline: String,
    pub description: String,
    /// `true` when any component came from the fallback templates.
    pub degraded: bool,
}

/// Generate event copy. Each component falls back independently; collaborator
/// failure never surfaces to the caller.
pub fn generate_copy(
    client: Option<&dyn TextCompletion>,
    event_type: &str,
    theme: &str,
) -> GeneratedCopy {
    let headline_prompt =
        format!("Create a catchy headline for a {event_type} with the theme '{theme}':");
    let tagline_prompt = format!("Write a creative tagline for a {theme}-themed {event_type}:");
    let description_prompt =
        format!("Write a short description for a {theme}-themed {event_type}:");

    let mut degraded = false;
    let mut component = |prompt: &str, fallback: String| -> String {
        match client.map(|c| c.complete(prompt)) {
            Some(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Some(Ok(_)) => {
                warn!("copy generation returned empty text, using fallback");
                degraded = true;
                fallback
            }
            Some(Err(e)) => {
                warn!(error = %e, "copy generation failed, using fallback");
                degraded = true;
                fallback
            }
            None => {
                degraded = true;
                fallback
            }
        }
    };

    let headline = component(
        &headline_prompt,
        format!("{} {event_type}", title_case(theme)),
    );
    let tagline = component(&tagline_prompt, format!("Experience the magic of {theme}"));
    let description = component(
        &description_prompt,
        format!("Join us for an unforgettable {event_type} experience themed around {theme}."),
    );

    GeneratedCopy {
        headline,
        tagline,
        description,
        degraded,
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
