//! Shader program handle

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::backend::{BackendError, ProgramId, RenderBackend, UniformValue};

/// One compiled, linked shader program.
///
/// Uniform names are resolved by the backend on every call; writing to a
/// name the program doesn't declare is a logged no-op.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub id: ProgramId,
    name: String,
}

impl ShaderProgram {
    /// Compile and link a program from paired vertex + fragment source text.
    pub fn compile(
        backend: &mut dyn RenderBackend,
        vertex_src: &str,
        fragment_src: &str,
        name: &str,
    ) -> Result<Self, BackendError> {
        let id = backend.compile_program(vertex_src, fragment_src, Some(name))?;
        Ok(Self {
            id,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make this program current for subsequent draws.
    pub fn bind(&self, backend: &mut dyn RenderBackend) {
        backend.use_program(self.id);
    }

    pub fn set_float(&self, backend: &mut dyn RenderBackend, name: &str, value: f32) {
        backend.set_uniform(self.id, name, UniformValue::Float(value));
    }

    pub fn set_int(&self, backend: &mut dyn RenderBackend, name: &str, value: i32) {
        backend.set_uniform(self.id, name, UniformValue::Int(value));
    }

    pub fn set_vec2(&self, backend: &mut dyn RenderBackend, name: &str, value: Vec2) {
        backend.set_uniform(self.id, name, UniformValue::Vec2(value));
    }

    pub fn set_vec3(&self, backend: &mut dyn RenderBackend, name: &str, value: Vec3) {
        backend.set_uniform(self.id, name, UniformValue::Vec3(value));
    }

    pub fn set_vec4(&self, backend: &mut dyn RenderBackend, name: &str, value: Vec4) {
        backend.set_uniform(self.id, name, UniformValue::Vec4(value));
    }

    pub fn set_mat4(&self, backend: &mut dyn RenderBackend, name: &str, value: Mat4) {
        backend.set_uniform(self.id, name, UniformValue::Mat4(value));
    }
}
