use image::RgbaImage;

use crate::model::{Rgba8, TextPosition, TextStyle};
use crate::text::TextRenderer;

/// Fixed palette cycled by batch index so a batch of placeholders stays
/// visually distinguishable.
pub const PALETTE: [Rgba8; 5] = [
    Rgba8::opaque(0xFF, 0x57, 0x33),
    Rgba8::opaque(0x33, 0xFF, 0x57),
    Rgba8::opaque(0x33, 0x57, 0xFF),
    Rgba8::opaque(0xF3, 0x33, 0xFF),
    Rgba8::opaque(0xFF, 0x33, 0x33),
];

pub const CAPTION: &str = "Image Generation Failed";

/// Solid placeholder colored by `index mod 5`.
pub fn solid(width: u32, height: u32, index: usize) -> RgbaImage {
    let c = PALETTE[index % PALETTE.len()];
    RgbaImage::from_pixel(width, height, c.as_image_rgba())
}

/// Top-to-bottom gradient with a centered failure caption plus the seed
/// text. This is the terminal fallback of the pipeline: no network, no
/// external dependency, always succeeds.
pub fn captioned_gradient(
    width: u32,
    height: u32,
    seed_text: &str,
    text: &mut TextRenderer,
) -> RgbaImage {
    let img = gradient(width, height);
    let style = TextStyle {
        size_px: 20.0,
        color: Rgba8::BLACK,
        position: TextPosition::Center,
        outline: false,
        outline_color: Rgba8::BLACK,
    };
    text.draw_centered_caption(&img, &[CAPTION, seed_text], &style)
}

/// Red and green fall off linearly with the row index while blue rises.
fn gradient(width: u32, height: u32) -> RgbaImage {
    let h = height.max(1);
    RgbaImage::from_fn(width, height, |_, y| {
        let t = f64::from(y) / f64::from(h);
        let r = (255.0 * (1.0 - t)) as u8;
        let g = (200.0 * (1.0 - t)) as u8;
        let b = (255.0 * t) as u8;
        image::Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cycles_by_index() {
        let a = solid(2, 2, 0);
        let f = solid(2, 2, 5);
        assert_eq!(a, f);
        let b = solid(2, 2, 1);
        assert_ne!(a, b);
        assert_eq!(a.get_pixel(0, 0).0, [0xFF, 0x57, 0x33, 255]);
        assert_eq!(b.get_pixel(0, 0).0, [0x33, 0xFF, 0x57, 255]);
    }

    #[test]
    fn gradient_endpoints() {
        let img = gradient(3, 100);
        let top = img.get_pixel(0, 0).0;
        let bottom = img.get_pixel(0, 99).0;
        assert_eq!(top, [255, 200, 0, 255]);
        assert!(bottom[0] < 10 && bottom[1] < 10 && bottom[2] > 245);
    }

    #[test]
    fn captioned_gradient_never_fails_without_font() {
        let mut text = TextRenderer::disabled();
        let img = captioned_gradient(64, 64, "rustic wedding", &mut text);
        assert_eq!(img.dimensions(), (64, 64));
        // Without a font the caption degrades to a no-op over the gradient.
        assert_eq!(img.get_pixel(0, 0).0, [255, 200, 0, 255]);
    }
}
