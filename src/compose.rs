use image::RgbaImage;
use image::imageops::FilterType;
use tracing::warn;

use crate::codec::decode_rgba;
use crate::model::{EditRequest, OverlayAnchor};
use crate::text::TextRenderer;

pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra opacity factor.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Compose encoded overlay bytes onto `base`. Malformed overlay bytes are
/// recovered locally: the base comes back unchanged, never an error.
pub fn compose(base: &RgbaImage, overlay_bytes: &[u8], anchor: OverlayAnchor, opacity: f32) -> RgbaImage {
    match decode_rgba(overlay_bytes) {
        Ok(overlay) => compose_decoded(base, &overlay, anchor, opacity),
        Err(e) => {
            warn!(error = %e, "overlay decode failed, returning base unchanged");
            base.clone()
        }
    }
}

/// Compose a decoded overlay onto `base` at the anchor with the given
/// opacity. Overlays larger than half the base in either axis are downscaled
/// to fit half-width x half-height, preserving aspect ratio.
pub fn compose_decoded(
    base: &RgbaImage,
    overlay: &RgbaImage,
    anchor: OverlayAnchor,
    opacity: f32,
) -> RgbaImage {
    let (bw, bh) = base.dimensions();
    if bw == 0 || bh == 0 || overlay.width() == 0 || overlay.height() == 0 {
        return base.clone();
    }

    let fitted;
    let overlay = if overlay.width() > bw / 2 || overlay.height() > bh / 2 {
        let (nw, nh) = fit_within(overlay.width(), overlay.height(), bw / 2, bh / 2);
        fitted = image::imageops::resize(overlay, nw, nh, FilterType::Lanczos3);
        &fitted
    } else {
        overlay
    };

    let (ow, oh) = overlay.dimensions();
    let (x0, y0) = anchor_offset(anchor, bw, bh, ow, oh);

    let mut out = base.clone();
    paste_over(&mut out, overlay, x0, y0, opacity);
    out
}

/// Apply one edit request to an image: effect, then text, then overlay.
/// Absent stages are no-ops; every stage recovers locally.
pub fn apply_edits(img: &RgbaImage, req: &EditRequest, text: &mut TextRenderer) -> RgbaImage {
    let mut out = crate::effects::apply(img, req.effect);

    if let Some(caption) = req.text.as_deref() {
        out = text.draw(&out, caption, &req.style.unwrap_or_default());
    }

    if let Some(overlay) = &req.overlay {
        out = compose(&out, &overlay.bytes, overlay.anchor, overlay.opacity);
    }

    out
}

/// Shrink-to-fit dimensions preserving aspect ratio. Never upscales.
fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let max_w = max_w.max(1);
    let max_h = max_h.max(1);
    if w <= max_w && h <= max_h {
        return (w, h);
    }
    let scale = f64::min(f64::from(max_w) / f64::from(w), f64::from(max_h) / f64::from(h));
    let nw = ((f64::from(w) * scale).round() as u32).clamp(1, max_w);
    let nh = ((f64::from(h) * scale).round() as u32).clamp(1, max_h);
    (nw, nh)
}

/// Top-left offset of the overlay: centered along the unconstrained axis,
/// flush along the named one.
fn anchor_offset(anchor: OverlayAnchor, bw: u32, bh: u32, ow: u32, oh: u32) -> (i64, i64) {
    let cx = (i64::from(bw) - i64::from(ow)) / 2;
    let cy = (i64::from(bh) - i64::from(oh)) / 2;
    match anchor {
        OverlayAnchor::Center => (cx, cy),
        OverlayAnchor::Top => (cx, 0),
        OverlayAnchor::Bottom => (cx, i64::from(bh) - i64::from(oh)),
        OverlayAnchor::Left => (0, cy),
        OverlayAnchor::Right => (i64::from(bw) - i64::from(ow), cy),
    }
}

/// Alpha-composited paste of `src` onto `dst` at `(x0, y0)`, scaling the
/// source alpha by `opacity`. Pixels whose effective alpha is zero leave the
/// destination byte-identical.
fn paste_over(dst: &mut RgbaImage, src: &RgbaImage, x0: i64, y0: i64, opacity: f32) {
    let (dw, dh) = dst.dimensions();
    for (sx, sy, px) in src.enumerate_pixels() {
        let x = x0 + i64::from(sx);
        let y = y0 + i64::from(sy);
        if x < 0 || y < 0 || x >= i64::from(dw) || y >= i64::from(dh) {
            continue;
        }
        let (x, y) = (x as u32, y as u32);

        let s = premul(px.0);
        let d = premul(dst.get_pixel(x, y).0);
        let blended = over(d, s, opacity);
        if blended == d {
            continue;
        }
        dst.put_pixel(x, y, image::Rgba(unpremul(blended)));
    }
}

fn premul(rgba: [u8; 4]) -> PremulRgba8 {
    let [r, g, b, a] = rgba;
    let a16 = u16::from(a);
    let p = |c: u8| -> u8 { ((u16::from(c) * a16 + 127) / 255) as u8 };
    [p(r), p(g), p(b), a]
}

fn unpremul(px: PremulRgba8) -> [u8; 4] {
    let [r, g, b, a] = px;
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a16 = u32::from(a);
    let u = |c: u8| -> u8 { ((u32::from(c) * 255 + a16 / 2) / a16).min(255) as u8 };
    [u(r), u(g), u(b), a]
}

fn mul_div255(x: u16, y: u16) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_png;

    fn uniform(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(rgba))
    }

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(over(dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src, 1.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn malformed_overlay_returns_base_byte_identical() {
        let base = uniform(4, 4, [9, 8, 7, 255]);
        let out = compose(&base, b"not an image at all", OverlayAnchor::Center, 1.0);
        assert_eq!(out, base);
    }

    #[test]
    fn opacity_zero_paste_is_byte_identical() {
        let base = uniform(8, 8, [10, 20, 30, 255]);
        let overlay = uniform(2, 2, [200, 100, 50, 255]);
        let out = compose_decoded(&base, &overlay, OverlayAnchor::Center, 0.0);
        assert_eq!(out, base);
    }

    #[test]
    fn opaque_overlay_replaces_center_region() {
        let base = uniform(8, 8, [0, 0, 0, 255]);
        let overlay = uniform(2, 2, [255, 0, 0, 255]);
        let out = compose_decoded(&base, &overlay, OverlayAnchor::Center, 1.0);
        assert_eq!(out.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(4, 4).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn oversized_overlay_is_downscaled_to_half_base() {
        let base = uniform(100, 100, [0, 0, 0, 255]);
        let overlay = uniform(200, 100, [255, 255, 255, 255]);
        // 200x100 fits to 50x25 (limited by half-width, aspect preserved).
        let out = compose_decoded(&base, &overlay, OverlayAnchor::Top, 1.0);
        // Flush to the top edge, centered horizontally: x in [25, 75), y in [0, 25).
        assert_eq!(out.get_pixel(50, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(50, 30).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(10, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn anchor_offsets_are_flush_along_named_axis() {
        assert_eq!(anchor_offset(OverlayAnchor::Center, 10, 10, 4, 4), (3, 3));
        assert_eq!(anchor_offset(OverlayAnchor::Top, 10, 10, 4, 4), (3, 0));
        assert_eq!(anchor_offset(OverlayAnchor::Bottom, 10, 10, 4, 4), (3, 6));
        assert_eq!(anchor_offset(OverlayAnchor::Left, 10, 10, 4, 4), (0, 3));
        assert_eq!(anchor_offset(OverlayAnchor::Right, 10, 10, 4, 4), (6, 3));
    }

    #[test]
    fn fit_within_preserves_aspect_and_never_upscales() {
        assert_eq!(fit_within(200, 100, 50, 50), (50, 25));
        assert_eq!(fit_within(100, 200, 50, 50), (25, 50));
        assert_eq!(fit_within(10, 10, 50, 50), (10, 10));
    }

    #[test]
    fn half_opacity_blends_channels() {
        let base = uniform(2, 2, [0, 0, 0, 255]);
        let overlay = uniform(2, 2, [255, 255, 255, 255]);
        let out = compose_decoded(&base, &overlay, OverlayAnchor::Center, 0.5);
        let px = out.get_pixel(0, 0).0;
        assert!(px[0] > 100 && px[0] < 160);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn apply_edits_with_empty_request_is_identity() {
        let base = uniform(4, 4, [1, 2, 3, 255]);
        let mut text = TextRenderer::disabled();
        let out = apply_edits(&base, &EditRequest::default(), &mut text);
        assert_eq!(out, base);
    }

    #[test]
    fn apply_edits_runs_overlay_after_effect() {
        let base = uniform(8, 8, [100, 100, 100, 255]);
        let overlay_png = encode_png(&uniform(2, 2, [0, 255, 0, 255])).unwrap();
        let req = EditRequest {
            effect: Some(crate::model::EffectKind::Vintage),
            text: None,
            style: None,
            overlay: Some(crate::model::OverlaySpec {
                bytes: overlay_png,
                anchor: OverlayAnchor::Center,
                opacity: 1.0,
            }),
        };
        let mut text = TextRenderer::disabled();
        let out = apply_edits(&base, &req, &mut text);
        // Overlay pixels survive on top of the sepia-toned base.
        assert_eq!(out.get_pixel(4, 4).0, [0, 255, 0, 255]);
        let corner = out.get_pixel(0, 0).0;
        assert!(corner[0] >= corner[1] && corner[1] >= corner[2]);
    }
}
