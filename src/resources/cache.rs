//! Name-keyed cache of shader programs and textures
//!
//! The cache is the single authority over resource identity: at most one
//! live program and one live texture per name. Shader and texture names
//! live in independent namespaces. The cache is an explicit value owned by
//! the application; create one per window (or per test) and pass it where
//! assets are loaded.

use std::collections::HashMap;
use std::path::Path;

use crate::backend::RenderBackend;
use crate::resources::error::ResourceError;
use crate::resources::program::ShaderProgram;
use crate::resources::texture::{Texture2d, TextureData};

/// Name-keyed store mediating creation, lookup, and teardown of shader
/// programs and textures.
#[derive(Default)]
pub struct ResourceCache {
    shaders: HashMap<String, ShaderProgram>,
    textures: HashMap<String, Texture2d>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read, compile, and link a shader program from two source files and
    /// store it under `name`.
    ///
    /// Re-loading an existing name destroys the previous program's backend
    /// object before the replacement is installed. On any failure the cache
    /// is left unchanged and the existing entry (if any) stays live.
    pub fn load_shader<P: AsRef<Path>>(
        &mut self,
        backend: &mut dyn RenderBackend,
        vertex_path: P,
        fragment_path: P,
        name: &str,
    ) -> Result<&ShaderProgram, ResourceError> {
        let vertex_src = read_source(vertex_path.as_ref())?;
        let fragment_src = read_source(fragment_path.as_ref())?;

        let program = ShaderProgram::compile(backend, &vertex_src, &fragment_src, name)?;
        if let Some(old) = self.shaders.remove(name) {
            log::debug!("replacing shader '{}', destroying old program", name);
            backend.destroy_program(old.id);
        }
        log::info!(
            "loaded shader '{}' from {} + {}",
            name,
            vertex_path.as_ref().display(),
            fragment_path.as_ref().display()
        );
        Ok(self.shaders.entry(name.to_string()).or_insert(program))
    }

    /// Look up a shader program by name. Never inserts on a miss.
    pub fn get_shader(&self, name: &str) -> Option<&ShaderProgram> {
        self.shaders.get(name)
    }

    /// Decode, upload, and store a texture under `name`.
    ///
    /// `force_alpha` promotes 3-channel images to RGBA. Overwrite semantics
    /// match [`load_shader`](Self::load_shader): the old backend texture is
    /// destroyed before the replacement lands, and a failed load leaves the
    /// cache unchanged.
    pub fn load_texture<P: AsRef<Path>>(
        &mut self,
        backend: &mut dyn RenderBackend,
        path: P,
        force_alpha: bool,
        name: &str,
    ) -> Result<&Texture2d, ResourceError> {
        let data = TextureData::from_file(path.as_ref(), force_alpha)?;
        log::info!(
            "loaded texture '{}' from {} ({}x{}, {:?})",
            name,
            path.as_ref().display(),
            data.width,
            data.height,
            data.format
        );
        self.install_texture(backend, &data, name)
    }

    /// Upload already-decoded or generated image data under `name`.
    ///
    /// This is the substitution path for fallback assets when a file load
    /// fails.
    pub fn add_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        data: &TextureData,
        name: &str,
    ) -> Result<&Texture2d, ResourceError> {
        self.install_texture(backend, data, name)
    }

    fn install_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        data: &TextureData,
        name: &str,
    ) -> Result<&Texture2d, ResourceError> {
        let texture = Texture2d::create(backend, data)?;
        if let Some(old) = self.textures.remove(name) {
            log::debug!("replacing texture '{}', destroying old texture", name);
            backend.destroy_texture(old.id);
        }
        Ok(self.textures.entry(name.to_string()).or_insert(texture))
    }

    /// Look up a texture by name. Never inserts on a miss.
    pub fn get_texture(&self, name: &str) -> Option<&Texture2d> {
        self.textures.get(name)
    }

    /// Number of shader programs currently cached.
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Number of textures currently cached.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Destroy every cached program and texture and drain both maps.
    ///
    /// Safe to call repeatedly; each backend object is destroyed exactly
    /// once, and lookups after a clear report absence.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (name, program) in self.shaders.drain() {
            log::debug!("destroying shader '{}'", name);
            backend.destroy_program(program.id);
        }
        for (name, texture) in self.textures.drain() {
            log::debug!("destroying texture '{}'", name);
            backend.destroy_texture(texture.id);
        }
    }
}

impl Drop for ResourceCache {
    fn drop(&mut self) {
        if !self.shaders.is_empty() || !self.textures.is_empty() {
            log::warn!(
                "resource cache dropped with {} shaders and {} textures still alive; \
                 call clear() before shutdown to release GPU objects",
                self.shaders.len(),
                self.textures.len()
            );
        }
    }
}

fn read_source(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|e| ResourceError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })
}
