//! Turns whatever the user uploaded into a base64 JPEG the model accepts

use crate::config::JPEG_QUALITY;
use crate::error::AnalysisError;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage, Rgba};
use std::fmt::Debug;
use std::io::Cursor;
use tracing::debug;

/// Image encodings the model service understands. Uploads are always
/// re-encoded, so the pipeline itself only ever produces `Jpeg`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    /// The short name, e.g. `jpeg`
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpeg",
            MediaType::Png => "png",
        }
    }

    /// The full MIME type, e.g. `image/jpeg`
    pub fn mime(&self) -> String {
        format!("image/{}", self.as_str())
    }
}

/// A base 64 image together with the encoding of the bytes it holds
#[derive(Clone, PartialEq)]
pub struct EncodedImage {
    data: String,
    media_type: MediaType,
}

impl Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EncodedImage {{ data: <{} chars>, media_type: {:?} }}",
            self.data.len(),
            self.media_type
        )
    }
}

impl EncodedImage {
    pub fn new(data: String, media_type: MediaType) -> Self {
        Self { data, media_type }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// A `data:` URI for embedding the image in a page
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.data)
    }
}

/// Decode an uploaded image of any supported format and re-encode it as a
/// base 64 JPEG
pub fn normalize(bytes: &[u8]) -> Result<EncodedImage, AnalysisError> {
    if bytes.is_empty() {
        return Err(AnalysisError::Decode("the uploaded file is empty".into()));
    }

    let image = image::load_from_memory(bytes)?;
    debug!(
        "decoded {}x{} image ({:?}) from {} bytes",
        image.width(),
        image.height(),
        image.color(),
        bytes.len()
    );

    let jpeg = encode_jpeg(flatten(image))?;
    Ok(EncodedImage::new(
        general_purpose::STANDARD.encode(jpeg),
        MediaType::Jpeg,
    ))
}

/// JPEG has no alpha channel, so composite onto white
fn flatten(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let over_white =
            |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

fn encode_jpeg(image: RgbImage) -> Result<Vec<u8>, AnalysisError> {
    let mut jpeg: Vec<u8> = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| AnalysisError::Decode(format!("could not re-encode image as JPEG: {e}")))?;
    Ok(jpeg)
}
