//! Texture loading and the uploaded-texture handle

use std::path::Path;

use image::DynamicImage;

use crate::backend::{
    BackendError, PixelFormat, RenderBackend, TextureDescriptor, TextureId,
};
use crate::resources::error::ResourceError;

/// Decoded (or generated) image data, ready for upload.
#[derive(Debug)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Decode an image file.
    ///
    /// Images are flipped vertically so V grows upward, matching the UV
    /// convention of the cube mesh. Unreadable and undecodable files both
    /// surface as [`ResourceError::DecodeFailure`].
    pub fn from_file<P: AsRef<Path>>(path: P, force_alpha: bool) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path).map_err(|e| ResourceError::DecodeFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(img, force_alpha, &name))
    }

    /// Decode an image from in-memory bytes.
    pub fn from_bytes(bytes: &[u8], force_alpha: bool, name: &str) -> Result<Self, ResourceError> {
        let img = image::load_from_memory(bytes).map_err(|e| ResourceError::DecodeFailure {
            path: name.into(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(img, force_alpha, name))
    }

    /// Derive the pixel format from the decoded channel count.
    ///
    /// 4 channels or `force_alpha` yield RGBA, 3 channels yield RGB, and 1-
    /// or 2-channel images (grayscale, luminance-alpha) are expanded to RGBA.
    fn from_image(img: DynamicImage, force_alpha: bool, name: &str) -> Self {
        let img = img.flipv();
        let channels = img.color().channel_count();

        let (format, pixels) = if channels == 4 || force_alpha || channels < 3 {
            (PixelFormat::Rgba, img.to_rgba8().into_raw())
        } else {
            (PixelFormat::Rgb, img.to_rgb8().into_raw())
        };

        Self {
            width: img.width(),
            height: img.height(),
            format,
            pixels,
            name: name.to_string(),
        }
    }

    /// Create a 1x1 solid color texture.
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            pixels: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a checkerboard texture with 8-pixel cells.
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                pixels.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: PixelFormat::Rgba,
            pixels,
            name: "checkerboard".to_string(),
        }
    }
}

/// One uploaded 2D texture: the backend handle plus its declared format and
/// dimensions.
#[derive(Debug, Clone)]
pub struct Texture2d {
    pub id: TextureId,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl Texture2d {
    /// Upload decoded image data through the backend.
    ///
    /// Sampling uses the backend's fixed defaults: repeat wrapping and
    /// linear filtering, no mipmaps.
    pub fn create(
        backend: &mut dyn RenderBackend,
        data: &TextureData,
    ) -> Result<Self, BackendError> {
        let id = backend.create_texture(
            &TextureDescriptor {
                label: Some(data.name.clone()),
                width: data.width,
                height: data.height,
                format: data.format,
            },
            &data.pixels,
        )?;

        Ok(Self {
            id,
            format: data.format,
            width: data.width,
            height: data.height,
        })
    }

    /// Bind this texture to a texture unit for subsequent draws.
    pub fn bind(&self, backend: &mut dyn RenderBackend, unit: u32) {
        backend.bind_texture(self.id, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32, color: image::ColorType) -> Vec<u8> {
        let channels = color.channel_count() as u32;
        let data = vec![127u8; (width * height * channels) as usize];
        let mut out = std::io::Cursor::new(Vec::new());
        image::write_buffer_with_format(
            &mut out,
            &data,
            width,
            height,
            color,
            image::ImageOutputFormat::Png,
        )
        .unwrap();
        out.into_inner()
    }

    #[test]
    fn three_channels_decode_as_rgb() {
        let png = encode_png(4, 2, image::ColorType::Rgb8);
        let data = TextureData::from_bytes(&png, false, "rgb").unwrap();
        assert_eq!(data.format, PixelFormat::Rgb);
        assert_eq!(data.pixels.len(), 4 * 2 * 3);
        assert_eq!((data.width, data.height), (4, 2));
    }

    #[test]
    fn force_alpha_promotes_rgb_to_rgba() {
        let png = encode_png(4, 2, image::ColorType::Rgb8);
        let data = TextureData::from_bytes(&png, true, "rgba").unwrap();
        assert_eq!(data.format, PixelFormat::Rgba);
        assert_eq!(data.pixels.len(), 4 * 2 * 4);
    }

    #[test]
    fn four_channels_decode_as_rgba() {
        let png = encode_png(2, 2, image::ColorType::Rgba8);
        let data = TextureData::from_bytes(&png, false, "rgba").unwrap();
        assert_eq!(data.format, PixelFormat::Rgba);
    }

    #[test]
    fn grayscale_expands_to_rgba() {
        let png = encode_png(2, 2, image::ColorType::L8);
        let data = TextureData::from_bytes(&png, false, "gray").unwrap();
        assert_eq!(data.format, PixelFormat::Rgba);
        assert_eq!(data.pixels.len(), 2 * 2 * 4);
    }

    #[test]
    fn garbage_bytes_are_a_decode_failure() {
        let err = TextureData::from_bytes(&[1, 2, 3, 4], false, "junk").unwrap_err();
        assert!(matches!(err, ResourceError::DecodeFailure { .. }));
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let data = TextureData::checkerboard(16, [255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(data.pixels.len(), 16 * 16 * 4);
        // First cell red, cell at (8, 0) blue.
        assert_eq!(&data.pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&data.pixels[8 * 4..8 * 4 + 4], &[0, 0, 255, 255]);
    }
}
