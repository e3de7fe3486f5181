//! litcube - a minimal real-time 3D rendering demo
//!
//! Opens a window, loads two shader programs and two textures through a
//! named resource cache, and draws a textured, Phong-lit cube with a moving
//! point light and a free-fly camera.
//!
//! The interesting piece is the resource layer: [`ResourceCache`] owns every
//! named GPU asset and mediates creation, lookup, and teardown against a
//! pluggable [`RenderBackend`]. The `wgpu-backend` feature provides the real
//! GPU implementation; the `null-backend` feature provides a recording
//! implementation so the whole resource lifecycle is testable without a GPU.

pub mod backend;
pub mod resources;
pub mod scene;

pub use backend::{
    BackendError, BackendResult, MeshId, PixelFormat, ProgramId, RenderBackend, TextureId,
    UniformValue,
};
pub use resources::{
    Mesh, ResourceCache, ResourceError, ShaderProgram, Texture2d, TextureData,
};
pub use scene::{Camera, CameraInput, FreeFlyController, PointLight};

#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_backend::WgpuBackend;
