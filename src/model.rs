use image::RgbaImage;

use crate::error::{MaquetteError, MaquetteResult};

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const BLACK: Self = Self::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` / `#rrggbbaa` hex or a small set of CSS color names.
    pub fn parse(s: &str) -> MaquetteResult<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            "red" => return Ok(Self::opaque(255, 0, 0)),
            "green" => return Ok(Self::opaque(0, 128, 0)),
            "blue" => return Ok(Self::opaque(0, 0, 255)),
            _ => {}
        }
        let hex = s.strip_prefix('#').ok_or_else(|| {
            MaquetteError::validation(format!("unknown color '{s}' (expected name or #rrggbb)"))
        })?;
        if hex.len() != 6 && hex.len() != 8 {
            return Err(MaquetteError::validation(
                "hex color must be #rrggbb or #rrggbbaa",
            ));
        }
        let byte = |i: usize| -> MaquetteResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| MaquetteError::validation(format!("invalid hex color '#{hex}'")))
        };
        Ok(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if hex.len() == 8 { byte(6)? } else { 255 },
        })
    }

    pub fn as_image_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

/// Visual transform applied by the effects stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Vintage,
    Bright,
    Contrast,
    Blur,
}

impl EffectKind {
    /// Unknown names map to `None`, which the effects stage treats as
    /// identity rather than an error.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "vintage" => Some(Self::Vintage),
            "bright" => Some(Self::Bright),
            "contrast" => Some(Self::Contrast),
            "blur" => Some(Self::Blur),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vintage => "vintage",
            Self::Bright => "bright",
            Self::Contrast => "contrast",
            Self::Blur => "blur",
        }
    }
}

/// Vertical placement of a text overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    #[default]
    Bottom,
    Center,
}

impl TextPosition {
    /// Unknown names fall back to `Bottom`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "center" => Self::Center,
            _ => Self::Bottom,
        }
    }
}

/// Anchor for an image overlay within the base image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayAnchor {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl OverlayAnchor {
    /// Unknown names fall back to `Center`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }
}

/// Text overlay styling with defaults applied at construction.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    pub size_px: f32,
    pub color: Rgba8,
    pub position: TextPosition,
    pub outline: bool,
    pub outline_color: Rgba8,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size_px: 36.0,
            color: Rgba8::WHITE,
            position: TextPosition::Bottom,
            outline: true,
            outline_color: Rgba8::BLACK,
        }
    }
}

/// Image overlay payload for an edit.
#[derive(Clone, Debug)]
pub struct OverlaySpec {
    /// Encoded image bytes (any format the decoder understands).
    pub bytes: Vec<u8>,
    pub anchor: OverlayAnchor,
    /// Overlay opacity in `[0, 1]`.
    pub opacity: f32,
}

/// One compositing operation. Absent fields are no-ops; stages apply in
/// fixed order: effect, then text, then image overlay.
#[derive(Clone, Debug, Default)]
pub struct EditRequest {
    pub effect: Option<EffectKind>,
    pub text: Option<String>,
    pub style: Option<TextStyle>,
    pub overlay: Option<OverlaySpec>,
}

impl EditRequest {
    pub fn is_noop(&self) -> bool {
        self.effect.is_none() && self.text.is_none() && self.overlay.is_none()
    }
}

/// Serializable summary of the edits that produced a derived artifact.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EditSummary {
    pub effect: Option<String>,
    pub text: Option<String>,
    pub text_style: Option<TextStyle>,
    pub has_overlay: bool,
}

impl EditSummary {
    pub fn from_request(req: &EditRequest) -> Self {
        Self {
            effect: req.effect.map(|e| e.name().to_string()),
            text: req.text.clone(),
            text_style: req.style,
            has_overlay: req.overlay.is_some(),
        }
    }
}

/// Metadata attached to every produced design.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DesignMeta {
    pub event_type: String,
    pub theme: String,
    pub prompt: String,
    /// Upstream model that produced the image; `None` for placeholders.
    pub model: Option<String>,
    pub is_placeholder: bool,
    /// 100.0 for fresh generations, 0.0 for placeholders, `[0, 100]` for
    /// similarity-search results.
    pub similarity_score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl DesignMeta {
    pub fn generated(event_type: &str, theme: &str, prompt: &str, model: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            theme: theme.to_string(),
            prompt: prompt.to_string(),
            model: Some(model.to_string()),
            is_placeholder: false,
            similarity_score: 100.0,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn placeholder(event_type: &str, theme: &str, prompt: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            theme: theme.to_string(),
            prompt: prompt.to_string(),
            model: None,
            is_placeholder: true,
            similarity_score: 0.0,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn search_result(event_type: &str, theme: &str, score: f64) -> Self {
        Self {
            event_type: event_type.to_string(),
            theme: theme.to_string(),
            prompt: String::new(),
            model: None,
            is_placeholder: false,
            similarity_score: score.clamp(0.0, 100.0),
            created_at: chrono::Utc::now(),
        }
    }
}

/// A produced design: owned pixels plus metadata. Never mutated in place;
/// edits produce a new artifact carrying `parent_id`.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub id: String,
    pub image: RgbaImage,
    pub meta: DesignMeta,
    pub parent_id: Option<String>,
    pub edits: Option<EditSummary>,
}

impl Artifact {
    pub fn new(image: RgbaImage, meta: DesignMeta) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image,
            meta,
            parent_id: None,
            edits: None,
        }
    }

    /// Derive an edited artifact. The parent is untouched; the derived id
    /// keeps the parent id as a readable prefix.
    pub fn derived(&self, image: RgbaImage, edits: EditSummary) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}_edited_{}", self.id, &suffix[..8]),
            image,
            meta: DesignMeta {
                created_at: chrono::Utc::now(),
                ..self.meta.clone()
            },
            parent_id: Some(self.id.clone()),
            edits: Some(edits),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Caller-facing serializable view (PNG data URI).
    pub fn record(&self) -> MaquetteResult<ArtifactRecord> {
        Ok(ArtifactRecord {
            id: self.id.clone(),
            url: crate::codec::png_data_uri(&self.image)?,
            similarity_score: self.meta.similarity_score,
            metadata: self.meta.clone(),
            parent_id: self.parent_id.clone(),
            edits: self.edits.clone(),
        })
    }
}

/// What the transport layer serializes for callers.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ArtifactRecord {
    pub id: String,
    pub url: String,
    pub similarity_score: f64,
    pub metadata: DesignMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_names_and_hex() {
        assert_eq!(Rgba8::parse("white").unwrap(), Rgba8::WHITE);
        assert_eq!(
            Rgba8::parse("#ff5733").unwrap(),
            Rgba8::opaque(0xFF, 0x57, 0x33)
        );
        assert_eq!(
            Rgba8::parse("#11223344").unwrap(),
            Rgba8 {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x44
            }
        );
        assert!(Rgba8::parse("chartreuse-ish").is_err());
        assert!(Rgba8::parse("#12345").is_err());
    }

    #[test]
    fn effect_names_round_trip_and_unknown_is_none() {
        assert_eq!(EffectKind::from_name("vintage"), Some(EffectKind::Vintage));
        assert_eq!(EffectKind::from_name(" BLUR "), Some(EffectKind::Blur));
        assert_eq!(EffectKind::from_name("solarize"), None);
        assert_eq!(EffectKind::Contrast.name(), "contrast");
    }

    #[test]
    fn position_and_anchor_fallbacks() {
        assert_eq!(TextPosition::from_name("top"), TextPosition::Top);
        assert_eq!(TextPosition::from_name("sideways"), TextPosition::Bottom);
        assert_eq!(OverlayAnchor::from_name("left"), OverlayAnchor::Left);
        assert_eq!(OverlayAnchor::from_name("diagonal"), OverlayAnchor::Center);
    }

    #[test]
    fn text_style_defaults() {
        let s = TextStyle::default();
        assert_eq!(s.size_px, 36.0);
        assert_eq!(s.color, Rgba8::WHITE);
        assert_eq!(s.position, TextPosition::Bottom);
        assert!(s.outline);
        assert_eq!(s.outline_color, Rgba8::BLACK);
    }

    #[test]
    fn derived_artifact_links_parent_and_keeps_parent_untouched() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]));
        let parent = Artifact::new(
            img.clone(),
            DesignMeta::generated("wedding", "rustic", "p", "m"),
        );
        let child = parent.derived(
            RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255])),
            EditSummary {
                effect: Some("vintage".into()),
                text: None,
                text_style: None,
                has_overlay: false,
            },
        );
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        assert!(child.id.starts_with(&parent.id));
        assert_ne!(child.id, parent.id);
        assert_eq!(parent.image, img);
    }
}
