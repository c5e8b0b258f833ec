use image::RgbaImage;

use crate::model::EffectKind;

/// Apply a named effect to an image. Absent or unknown effects are identity,
/// never an error. Always returns a new buffer; the input is not mutated.
pub fn apply(img: &RgbaImage, effect: Option<EffectKind>) -> RgbaImage {
    match effect {
        None => img.clone(),
        Some(EffectKind::Vintage) => vintage(img),
        Some(EffectKind::Bright) => brightness(img, 1.3),
        Some(EffectKind::Contrast) => contrast(img, 1.5),
        Some(EffectKind::Blur) => gaussian_blur(img, 2, 2.0),
    }
}

/// Per-pixel linear sepia transform. Channels clamp to 255 and alpha is
/// forced opaque.
fn vintage(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let [r, g, b, _] = px.0;
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let tr = 0.393 * r + 0.769 * g + 0.189 * b;
        let tg = 0.349 * r + 0.686 * g + 0.168 * b;
        let tb = 0.272 * r + 0.534 * g + 0.131 * b;
        px.0 = [clamp_u8(tr), clamp_u8(tg), clamp_u8(tb), 255];
    }
    out
}

fn brightness(img: &RgbaImage, factor: f32) -> RgbaImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        px.0 = [
            clamp_u8(f32::from(r) * factor),
            clamp_u8(f32::from(g) * factor),
            clamp_u8(f32::from(b) * factor),
            a,
        ];
    }
    out
}

/// Contrast about the mean grayscale level: `c' = mean + (c - mean) * factor`.
fn contrast(img: &RgbaImage, factor: f32) -> RgbaImage {
    let mean = mean_luma(img);
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0;
        let adjust = |c: u8| clamp_u8(mean + (f32::from(c) - mean) * factor);
        px.0 = [adjust(r), adjust(g), adjust(b), a];
    }
    out
}

fn mean_luma(img: &RgbaImage) -> f32 {
    let n = (img.width() as u64) * (img.height() as u64);
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0u64;
    for px in img.pixels() {
        let [r, g, b, _] = px.0;
        sum += (u64::from(r) * 299 + u64::from(g) * 587 + u64::from(b) * 114) / 1000;
    }
    (sum / n) as f32
}

/// Separable Gaussian blur over straight-alpha RGBA8 with a Q16 fixed-point
/// kernel. Edge pixels clamp.
fn gaussian_blur(img: &RgbaImage, radius: u32, sigma: f32) -> RgbaImage {
    if radius == 0 {
        return img.clone();
    }
    let (width, height) = img.dimensions();
    let kernel = gaussian_kernel_q16(radius, sigma);

    let src = img.as_raw();
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);

    RgbaImage::from_raw(width, height, out).unwrap_or_else(|| img.clone())
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    let r = radius as i32;
    let sigma = f64::from(sigma.max(f32::EPSILON));
    let denom = 2.0 * sigma * sigma;

    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Re-center rounding drift on the middle tap so the kernel sums to 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }
    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(rgba))
    }

    #[test]
    fn absent_effect_is_identity() {
        let img = uniform(3, 2, [10, 120, 240, 200]);
        assert_eq!(apply(&img, None), img);
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let img = uniform(2, 2, [50, 60, 70, 255]);
        let before = img.clone();
        let _ = apply(&img, Some(EffectKind::Vintage));
        assert_eq!(img, before);
    }

    #[test]
    fn vintage_gray_pixel_has_sepia_channel_ordering() {
        // For r=g=b=v, the matrix weights sum to 1.351 / 1.203 / 0.937,
        // so tr >= tg >= tb for any v > 0.
        let img = uniform(1, 1, [100, 100, 100, 255]);
        let out = apply(&img, Some(EffectKind::Vintage));
        let [tr, tg, tb, ta] = out.get_pixel(0, 0).0;
        assert!(tr >= tg && tg >= tb);
        assert!(tb > 0);
        assert_eq!(ta, 255);
    }

    #[test]
    fn vintage_clamps_bright_pixels() {
        let img = uniform(1, 1, [255, 255, 255, 10]);
        let out = apply(&img, Some(EffectKind::Vintage));
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 239, 255]);
    }

    #[test]
    fn bright_scales_channels_and_keeps_alpha() {
        let img = uniform(1, 1, [100, 200, 0, 77]);
        let out = apply(&img, Some(EffectKind::Bright));
        assert_eq!(out.get_pixel(0, 0).0, [130, 255, 0, 77]);
    }

    #[test]
    fn contrast_pushes_channels_away_from_mean() {
        let mut img = uniform(2, 1, [0, 0, 0, 255]);
        img.put_pixel(1, 0, image::Rgba([200, 200, 200, 255]));
        let out = apply(&img, Some(EffectKind::Contrast));
        let dark = out.get_pixel(0, 0).0;
        let light = out.get_pixel(1, 0).0;
        assert!(dark[0] < 1);
        assert!(light[0] > 200);
    }

    #[test]
    fn contrast_is_identity_on_flat_image() {
        let img = uniform(4, 4, [80, 80, 80, 255]);
        let out = apply(&img, Some(EffectKind::Contrast));
        assert_eq!(out, img);
    }

    #[test]
    fn blur_constant_image_is_identity() {
        let img = uniform(5, 4, [10, 20, 30, 40]);
        let out = apply(&img, Some(EffectKind::Blur));
        assert_eq!(out, img);
    }

    #[test]
    fn blur_spreads_energy_from_single_pixel() {
        let mut img = uniform(7, 7, [0, 0, 0, 0]);
        img.put_pixel(3, 3, image::Rgba([255, 255, 255, 255]));
        let out = apply(&img, Some(EffectKind::Blur));

        let nonzero = out.pixels().filter(|px| px.0[3] != 0).count();
        assert!(nonzero > 1);

        let sum_a: u32 = out.pixels().map(|px| u32::from(px.0[3])).sum();
        assert!((sum_a as i32 - 255).abs() <= 8);
    }
}
