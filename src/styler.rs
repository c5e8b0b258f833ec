//! Text style presets, AI-suggested style names, and styled caption
//! variations of an artifact.

use image::RgbaImage;
use tracing::warn;

use crate::codec;
use crate::error::MaquetteResult;
use crate::model::{Rgba8, TextPosition, TextStyle};
use crate::text::TextRenderer;
use crate::upstream::TextCompletion;

/// A named text styling recipe. Describes styling only; it never mutates
/// image state itself.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StylePreset {
    pub name: String,
    pub font: String,
    pub color: Rgba8,
    pub effects: Vec<String>,
}

impl StylePreset {
    fn new(name: &str, font: &str, color: Rgba8, effects: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            font: font.to_string(),
            color,
            effects: effects.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Overlay style derived from this preset.
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            color: self.color,
            position: TextPosition::Bottom,
            ..TextStyle::default()
        }
    }
}

pub fn preset_styles() -> Vec<StylePreset> {
    vec![
        StylePreset::new(
            "Modern Minimal",
            "Helvetica",
            Rgba8::opaque(0x00, 0x00, 0x00),
            &["shadow", "gradient"],
        ),
        StylePreset::new(
            "Elegant Script",
            "Playfair",
            Rgba8::opaque(0x8B, 0x45, 0x13),
            &["gold-foil", "3d"],
        ),
        StylePreset::new(
            "Bold Impact",
            "Impact",
            Rgba8::opaque(0xFF, 0x00, 0x00),
            &["neon", "glow"],
        ),
        StylePreset::new(
            "Vintage",
            "Old Standard",
            Rgba8::opaque(0x4A, 0x4A, 0x4A),
            &["distressed", "texture"],
        ),
        StylePreset::new(
            "Artistic",
            "Brush Script",
            Rgba8::opaque(0x1E, 0x90, 0xFF),
            &["watercolor", "handdrawn"],
        ),
    ]
}

/// Ask the text collaborator for style name suggestions; collaborator
/// failure falls back to the presets silently.
pub fn suggest_styles(
    client: Option<&dyn TextCompletion>,
    text: &str,
    count: usize,
) -> Vec<StylePreset> {
    let presets = preset_styles();
    let count = count.clamp(1, presets.len());

    let Some(client) = client else {
        return presets.into_iter().take(count).collect();
    };

    let prompt = format!(
        "Suggest {count} short names for creative text styles suited to: '{text}'. One per line."
    );
    match client.complete(&prompt) {
        Ok(reply) => {
            let names: Vec<String> = reply
                .lines()
                .map(|l| l.trim().trim_start_matches(['-', '*', ' ']).to_string())
                .filter(|l| !l.is_empty())
                .take(count)
                .collect();
            let mut out = Vec::with_capacity(count);
            for (i, preset) in presets.into_iter().take(count).enumerate() {
                out.push(match names.get(i) {
                    Some(name) => StylePreset {
                        name: name.clone(),
                        ..preset
                    },
                    None => preset,
                });
            }
            out
        }
        Err(e) => {
            warn!(error = %e, "style suggestion failed, using presets");
            presets.into_iter().take(count).collect()
        }
    }
}

/// One styled caption rendering of a source image.
#[derive(Clone, Debug)]
pub struct StyledVariation {
    pub style: StylePreset,
    pub image: RgbaImage,
}

impl StyledVariation {
    /// Serializable view with a PNG data URI.
    pub fn record(&self) -> MaquetteResult<serde_json::Value> {
        Ok(serde_json::json!({
            "url": codec::png_data_uri(&self.image)?,
            "style_name": self.style.name,
            "style_details": {
                "font": self.style.font,
                "color": self.style.color,
                "effects": self.style.effects,
            },
        }))
    }
}

/// Render one caption variation per style. Styles whose rendering degrades
/// to a no-op (e.g. no font) are still returned; the caller can compare
/// against the source if it cares.
pub fn text_variations(
    img: &RgbaImage,
    text: &str,
    styles: &[StylePreset],
    renderer: &mut TextRenderer,
) -> Vec<StyledVariation> {
    styles
        .iter()
        .map(|preset| StyledVariation {
            style: preset.clone(),
            image: renderer.draw(img, text, &preset.text_style()),
        })
        .collect()
}
