//! Recording backend for tests and headless runs.
//!
//! This backend doesn't perform actual GPU operations but allocates real
//! handles and records every call, so the resource-management layer can be
//! exercised without GPU hardware. Compilation rejects empty source text so
//! failure paths stay testable.

use std::collections::HashMap;

use crate::backend::traits::{
    BackendError, BackendResult, MeshId, ProgramId, RenderBackend, TextureId,
};
use crate::backend::types::{
    PixelFormat, TextureDescriptor, UniformValue, Vertex, MAX_TEXTURE_UNITS,
};

/// Recorded state of a live texture.
#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub byte_len: usize,
}

/// Recorded state of a live mesh.
#[derive(Debug, Clone)]
pub struct MeshRecord {
    pub vertex_count: usize,
    pub index_count: usize,
}

/// Recording GPU backend.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_program_id: u64,
    next_texture_id: u64,
    next_mesh_id: u64,

    programs: HashMap<u64, String>,
    textures: HashMap<u64, TextureRecord>,
    meshes: HashMap<u64, MeshRecord>,

    program_destroys: HashMap<u64, usize>,
    texture_destroys: HashMap<u64, usize>,

    uniforms: HashMap<(u64, String), UniformValue>,
    active_program: Option<ProgramId>,
    bound_units: [Option<TextureId>; MAX_TEXTURE_UNITS],

    programs_created: usize,
    textures_created: usize,
    draws: usize,
    frames: usize,
    wireframe: bool,
    size: (u32, u32),
}

impl NullBackend {
    /// Create a new recording backend.
    pub fn new() -> Self {
        Self {
            size: (1, 1),
            ..Self::default()
        }
    }

    /// Number of programs currently alive (created and not destroyed).
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of textures currently alive.
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Total programs ever compiled successfully.
    pub fn programs_created(&self) -> usize {
        self.programs_created
    }

    /// Total textures ever uploaded.
    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    /// How many times `destroy_program` ran for this handle.
    pub fn program_destroy_count(&self, program: ProgramId) -> usize {
        self.program_destroys.get(&program.0).copied().unwrap_or(0)
    }

    /// How many times `destroy_texture` ran for this handle.
    pub fn texture_destroy_count(&self, texture: TextureId) -> usize {
        self.texture_destroys.get(&texture.0).copied().unwrap_or(0)
    }

    /// Last value written to a uniform of a live program.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.uniforms.get(&(program.0, name.to_string())).copied()
    }

    /// Recorded upload state of a live texture.
    pub fn texture_record(&self, texture: TextureId) -> Option<&TextureRecord> {
        self.textures.get(&texture.0)
    }

    /// The program made current by the last `use_program` call.
    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    /// The texture bound to a unit, if any.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.bound_units.get(unit as usize).copied().flatten()
    }

    /// Draw calls recorded since creation.
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// Frames begun since creation.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Whether wireframe rasterization is currently requested.
    pub fn wireframe(&self) -> bool {
        self.wireframe
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &'static str {
        "Null Backend"
    }

    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        label: Option<&str>,
    ) -> BackendResult<ProgramId> {
        if vertex_src.trim().is_empty() {
            return Err(BackendError::CompileFailed(
                "vertex stage: empty source".into(),
            ));
        }
        if fragment_src.trim().is_empty() {
            return Err(BackendError::CompileFailed(
                "fragment stage: empty source".into(),
            ));
        }

        let id = self.next_program_id;
        self.next_program_id += 1;
        self.programs
            .insert(id, label.unwrap_or("unnamed").to_string());
        self.programs_created += 1;
        log::trace!("NullBackend: compiled program {:?} as {}", label, id);
        Ok(ProgramId(id))
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(&program.0) {
            log::warn!("NullBackend: use_program on unknown program {}", program.0);
            return;
        }
        self.active_program = Some(program);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        if !self.programs.contains_key(&program.0) {
            log::warn!(
                "NullBackend: uniform '{}' set on unknown program {}",
                name,
                program.0
            );
            return;
        }
        self.uniforms.insert((program.0, name.to_string()), value);
    }

    fn create_texture(
        &mut self,
        desc: &TextureDescriptor,
        pixels: &[u8],
    ) -> BackendResult<TextureId> {
        let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
        if pixels.len() != expected {
            return Err(BackendError::TextureCreationFailed(format!(
                "pixel data is {} bytes, expected {} for {}x{} {:?}",
                pixels.len(),
                expected,
                desc.width,
                desc.height,
                desc.format
            )));
        }

        let id = self.next_texture_id;
        self.next_texture_id += 1;
        self.textures.insert(
            id,
            TextureRecord {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                byte_len: pixels.len(),
            },
        );
        self.textures_created += 1;
        log::trace!(
            "NullBackend: created texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        Ok(TextureId(id))
    }

    fn bind_texture(&mut self, texture: TextureId, unit: u32) {
        if unit as usize >= MAX_TEXTURE_UNITS {
            log::warn!("NullBackend: texture unit {} out of range", unit);
            return;
        }
        self.bound_units[unit as usize] = Some(texture);
    }

    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
        label: Option<&str>,
    ) -> BackendResult<MeshId> {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(
            id,
            MeshRecord {
                vertex_count: vertices.len(),
                index_count: indices.len(),
            },
        );
        log::trace!(
            "NullBackend: created mesh {:?} ({} vertices, {} indices)",
            label,
            vertices.len(),
            indices.len()
        );
        Ok(MeshId(id))
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program.0).is_none() {
            log::warn!(
                "NullBackend: destroy_program on already-destroyed program {}",
                program.0
            );
        }
        *self.program_destroys.entry(program.0).or_insert(0) += 1;
        self.uniforms.retain(|(id, _), _| *id != program.0);
        if self.active_program == Some(program) {
            self.active_program = None;
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_none() {
            log::warn!(
                "NullBackend: destroy_texture on already-destroyed texture {}",
                texture.0
            );
        }
        *self.texture_destroys.entry(texture.0).or_insert(0) += 1;
        for slot in self.bound_units.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_wireframe(&mut self, enabled: bool) {
        self.wireframe = enabled;
    }

    fn begin_frame(&mut self, _clear_color: [f32; 4]) -> BackendResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: MeshId) {
        if self.active_program.is_none() {
            log::warn!("NullBackend: draw_mesh with no active program");
            return;
        }
        if !self.meshes.contains_key(&mesh.0) {
            log::warn!("NullBackend: draw_mesh on unknown mesh {}", mesh.0);
            return;
        }
        self.draws += 1;
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        Ok(())
    }
}
