//! Core backend abstraction trait
//!
//! [`RenderBackend`] is the interface the resource cache and the demo loop
//! call into. The wgpu implementation does real GPU work; the null
//! implementation records operations for tests and headless runs.

use thiserror::Error;

use crate::backend::types::{TextureDescriptor, UniformValue, Vertex};

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Shader compilation failed: {0}")]
    CompileFailed(String),
    #[error("Program link failed: {0}")]
    LinkFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create mesh buffers: {0}")]
    MeshCreationFailed(String),
    #[error("Failed to acquire next frame: {0}")]
    AcquireFrameFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a compiled and linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u64);

/// Handle to an uploaded GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u64);

/// Handle to an uploaded mesh (vertex + index buffers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) u64);

/// GPU backend trait.
///
/// All operations are single-threaded and synchronous; handles returned by
/// the `create_*`/`compile_*` calls stay valid until the matching `destroy_*`
/// call. Destroying a handle twice is a logged no-op in both implementations.
pub trait RenderBackend {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Compile and link a program from paired vertex + fragment source text.
    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        label: Option<&str>,
    ) -> BackendResult<ProgramId>;

    /// Make a program current for subsequent draws.
    fn use_program(&mut self, program: ProgramId);

    /// Write a named uniform of a program.
    ///
    /// The name is resolved on every call; an unknown name (or a value whose
    /// size does not match the declared member) logs a warning and no-ops.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    /// Upload pixel data as a new texture.
    fn create_texture(&mut self, desc: &TextureDescriptor, pixels: &[u8])
        -> BackendResult<TextureId>;

    /// Bind a texture to a texture unit for subsequent draws.
    fn bind_texture(&mut self, texture: TextureId, unit: u32);

    /// Upload vertex and index data as a new mesh.
    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
        label: Option<&str>,
    ) -> BackendResult<MeshId>;

    /// Destroy a program object.
    fn destroy_program(&mut self, program: ProgramId);

    /// Destroy a texture object.
    fn destroy_texture(&mut self, texture: TextureId);

    /// Resize the output surface.
    fn resize(&mut self, width: u32, height: u32);

    /// Get the current surface size.
    fn surface_size(&self) -> (u32, u32);

    /// Toggle wireframe rasterization for subsequent frames.
    fn set_wireframe(&mut self, enabled: bool);

    /// Begin a frame, clearing the surface to the given color.
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> BackendResult<()>;

    /// Draw a mesh with the current program, uniforms, and bound textures.
    fn draw_mesh(&mut self, mesh: MeshId);

    /// Finish and present the frame.
    fn end_frame(&mut self) -> BackendResult<()>;
}
