//! Common types shared between backends

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Number of texture units a program can have bound at once.
pub const MAX_TEXTURE_UNITS: usize = 4;

/// Pixel layout of decoded image data.
///
/// `Rgb` pixels are tightly packed, 3 bytes each; `Rgba` pixels are 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Texture descriptor
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
        }
    }
}

/// A value written to a named uniform of a shader program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Byte size of the value as it lands in a uniform block.
    pub fn size(&self) -> usize {
        match self {
            UniformValue::Float(_) | UniformValue::Int(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_) => 12,
            UniformValue::Vec4(_) => 16,
            UniformValue::Mat4(_) => 64,
        }
    }

    /// Write the raw bytes into `out`, which must be exactly `self.size()` long.
    pub fn write_to(&self, out: &mut [u8]) {
        match self {
            UniformValue::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Int(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec4(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Mat4(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
        }
    }
}

/// Standard vertex with position, normal, and UV
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_value_size_matches_written_bytes() {
        let mut buf = [0u8; 64];
        let value = UniformValue::Mat4(Mat4::IDENTITY);
        value.write_to(&mut buf[..value.size()]);
        assert_eq!(&buf[..4], bytemuck::bytes_of(&1.0f32));

        let value = UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(value.size(), 12);
        value.write_to(&mut buf[..12]);
        assert_eq!(&buf[4..8], bytemuck::bytes_of(&2.0f32));
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}
