use std::io::Cursor;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;

use crate::error::MaquetteResult;

pub fn decode_rgba(bytes: &[u8]) -> MaquetteResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

pub fn encode_png(img: &RgbaImage) -> MaquetteResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// `data:image/png;base64,...` URI for inline display of an artifact.
pub fn png_data_uri(img: &RgbaImage) -> MaquetteResult<String> {
    let png = encode_png(img)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
