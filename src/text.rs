use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, warn};

use crate::model::{Rgba8, TextPosition, TextStyle};

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Well-known system font locations tried when no font path is configured.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

struct LoadedFont {
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

/// Styled text rasterizer. Shapes with Parley and rasterizes with the CPU
/// vector backend, then alpha-composites onto the target image.
///
/// Font-loading failure never aborts rendering: a renderer without a font
/// degrades every draw to a logged no-op.
pub struct TextRenderer {
    font: Option<LoadedFont>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    render_ctx: Option<vello_cpu::RenderContext>,
}

impl TextRenderer {
    /// Resolve a font from `font_path` if given, otherwise from well-known
    /// system locations.
    pub fn new(font_path: Option<&Path>) -> Self {
        let mut candidates = Vec::<PathBuf>::new();
        if let Some(p) = font_path {
            candidates.push(p.to_path_buf());
        }
        candidates.extend(SYSTEM_FONT_PATHS.iter().map(PathBuf::from));

        for path in &candidates {
            match std::fs::read(path) {
                Ok(bytes) => match Self::from_font_bytes(bytes) {
                    Ok(r) => {
                        debug!(path = %path.display(), "text overlay font loaded");
                        return r;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "font rejected"),
                },
                Err(_) => continue,
            }
        }

        warn!("no usable font found, text overlays are disabled");
        Self::disabled()
    }

    /// Build a renderer from raw font bytes (TTF/OTF/TTC).
    pub fn from_font_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| anyhow::anyhow!("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| anyhow::anyhow!("registered font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);

        Ok(Self {
            font: Some(LoadedFont { family_name, font }),
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            render_ctx: None,
        })
    }

    /// Renderer with no font; every draw is an identity no-op.
    pub fn disabled() -> Self {
        Self {
            font: None,
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            render_ctx: None,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw styled text onto a copy of `img`. Anchoring follows the style
    /// position; an outline is four offset draws under the main fill.
    pub fn draw(&mut self, img: &RgbaImage, text: &str, style: &TextStyle) -> RgbaImage {
        if text.is_empty() {
            return img.clone();
        }
        if !style.size_px.is_finite() || style.size_px <= 0.0 {
            warn!(size = style.size_px, "text size must be finite and > 0, skipping overlay");
            return img.clone();
        }
        let (w, h) = img.dimensions();
        let (Ok(w16), Ok(h16)) = (u16::try_from(w), u16::try_from(h)) else {
            warn!("image dimensions exceed text raster limits, skipping overlay");
            return img.clone();
        };
        if self.font.is_none() {
            warn!("text overlay skipped: no font available");
            return img.clone();
        }

        let layer = match self.rasterize(text, style, w16, h16, w, h) {
            Ok(layer) => layer,
            Err(e) => {
                warn!(error = %e, "text rasterization failed, returning image unchanged");
                return img.clone();
            }
        };

        composite_premul_layer(img, &layer)
    }

    /// Multi-line centered caption used by placeholder synthesis.
    pub fn draw_centered_caption(&mut self, img: &RgbaImage, lines: &[&str], style: &TextStyle) -> RgbaImage {
        let joined = lines.join("\n");
        let style = TextStyle {
            position: TextPosition::Center,
            ..*style
        };
        self.draw(img, &joined, &style)
    }

    fn rasterize(
        &mut self,
        text: &str,
        style: &TextStyle,
        w16: u16,
        h16: u16,
        w: u32,
        h: u32,
    ) -> anyhow::Result<Vec<u8>> {
        let loaded = self
            .font
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no font loaded"))?;
        let family_name = loaded.family_name.clone();
        let font = loaded.font.clone();

        let brush = TextBrushRgba8::from(style.color);
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let tw = f64::from(layout.width());
        let th = f64::from(layout.height());
        let (x, y) = anchor_xy(style.position, f64::from(w), f64::from(h), tw, th);

        let mut ctx = match self.render_ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();

        if style.outline {
            let oc = style.outline_color;
            for (dx, dy) in [(-2.0, -2.0), (2.0, -2.0), (-2.0, 2.0), (2.0, 2.0)] {
                draw_layout_glyphs(&mut ctx, &layout, &font, oc, x + dx, y + dy);
            }
        }
        draw_layout_glyphs(&mut ctx, &layout, &font, style.color, x, y);

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        let bytes = pixmap.data_as_u8_slice().to_vec();
        self.render_ctx = Some(ctx);
        Ok(bytes)
    }
}

/// Anchor position for the text block's top-left corner. Horizontal
/// centering subtracts half the rendered width from the midline.
pub(crate) fn anchor_xy(position: TextPosition, w: f64, h: f64, tw: f64, th: f64) -> (f64, f64) {
    let (cx, y) = match position {
        TextPosition::Top => (w / 2.0, th + 20.0),
        TextPosition::Bottom => (w / 2.0, h - th - 20.0),
        TextPosition::Center => (w / 2.0, h / 2.0),
    };
    (cx - tw / 2.0, y)
}

fn draw_layout_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrushRgba8>,
    font: &vello_cpu::peniko::FontData,
    color: Rgba8,
    x: f64,
    y: f64,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

/// Composite a premultiplied RGBA8 layer over a straight-alpha image.
fn composite_premul_layer(base: &RgbaImage, layer_premul: &[u8]) -> RgbaImage {
    let mut out = base.clone();
    for (px, src) in out.pixels_mut().zip(layer_premul.chunks_exact(4)) {
        if src[3] == 0 {
            continue;
        }
        let d = premul(px.0);
        let blended = crate::compose::over(d, [src[0], src[1], src[2], src[3]], 1.0);
        px.0 = unpremul(blended);
    }
    out
}

fn premul(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    let a16 = u16::from(a);
    let p = |c: u8| -> u8 { ((u16::from(c) * a16 + 127) / 255) as u8 };
    [p(r), p(g), p(b), a]
}

fn unpremul(px: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = px;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a32 = u32::from(a);
    let u = |c: u8| -> u8 { ((u32::from(c) * 255 + a32 / 2) / a32).min(255) as u8 };
    [u(r), u(g), u(b), a]
}
