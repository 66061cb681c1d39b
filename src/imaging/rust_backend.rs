//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageDecoder::dimensions` + `ImageDecoder::orientation` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders, format sniffed from content |
//! | Orientation | `DynamicImage::apply_orientation` from the EXIF tag |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configurable quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, TileFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::borrow::Cow;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a decoder for `path`, sniffing the format from the file content so a
/// misnamed extension still decodes.
fn open_decoder(path: &Path) -> Result<impl ImageDecoder, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// Read the orientation tag; a missing or malformed tag means upright.
fn read_orientation(decoder: &mut impl ImageDecoder) -> Orientation {
    decoder.orientation().unwrap_or(Orientation::NoTransforms)
}

/// Whether applying `orientation` swaps width and height.
fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

/// Encode `tile` into an in-memory buffer.
fn encode_to_vec(tile: &DynamicImage, params: &EncodeParams) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    match params.format {
        TileFormat::Jpeg => {
            // JPEG has no alpha channel; flatten everything to RGB8
            let rgb = DynamicImage::ImageRgb8(tile.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality.value() as u8);
            rgb.write_with_encoder(encoder)?;
        }
        TileFormat::Png => {
            let tile: Cow<'_, DynamicImage> = match tile {
                DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                    Cow::Owned(DynamicImage::ImageRgba8(tile.to_rgba8()))
                }
                other => Cow::Borrowed(other),
            };
            tile.write_with_encoder(PngEncoder::new(&mut buf))?;
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let mut decoder = open_decoder(path)?;
        let (width, height) = decoder.dimensions();
        if swaps_axes(read_orientation(&mut decoder)) {
            Ok(Dimensions {
                width: height,
                height: width,
            })
        } else {
            Ok(Dimensions { width, height })
        }
    }

    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let mut decoder = open_decoder(path)?;
        let orientation = read_orientation(&mut decoder);
        let mut img = DynamicImage::from_decoder(decoder)
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        img.apply_orientation(orientation);
        Ok(img)
    }

    fn resize(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot resize to {width}x{height}"
            )));
        }
        Ok(source.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn encode_tile(
        &self,
        tile: &DynamicImage,
        params: &EncodeParams,
        output: &Path,
    ) -> Result<(), BackendError> {
        let bytes = encode_to_vec(tile, params)
            .map_err(|e| BackendError::Encode(format!("{}: {}", output.display(), e)))?;
        std::fs::write(output, bytes)?;
        Ok(())
    }
}
