//! wgpu backend implementation
//!
//! Shader sources are WGSL with `vs_main` / `fs_main` entry points and all
//! resources in bind group 0. Sources are parsed and validated through naga
//! before they reach the device, which makes compile failures catchable and
//! yields the reflection data the named-uniform contract needs: uniform block
//! member offsets and sampled-texture bindings. Texture units map to the
//! program's texture bindings in ascending binding order.

use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::backend::traits::{
    BackendError, BackendResult, MeshId, ProgramId, RenderBackend, TextureId,
};
use crate::backend::types::{
    PixelFormat, TextureDescriptor, UniformValue, Vertex, MAX_TEXTURE_UNITS,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Capacity of the per-frame uniform arena. Every draw call snapshots the
/// active program's uniform block into one aligned slot of this buffer.
const UNIFORM_ARENA_SIZE: u64 = 256 * 1024;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// One member of a program's uniform block, resolved by reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UniformMember {
    offset: u32,
    size: u32,
}

/// Group-0 resource interface of a program, merged across both stages.
#[derive(Debug, Clone, Default)]
struct ProgramLayout {
    uniform_binding: Option<u32>,
    block_size: u32,
    members: HashMap<String, UniformMember>,
    /// Sampled-texture bindings in ascending order; index = texture unit.
    texture_bindings: Vec<u32>,
    sampler_bindings: Vec<u32>,
}

struct ProgramData {
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: wgpu::BindGroupLayout,
    layout: ProgramLayout,
    /// CPU copy of the uniform block, written by `set_uniform`.
    staging: Vec<u8>,
    label: String,
}

struct TextureEntry {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct MeshData {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Cache key for bind groups: a program plus the textures bound to its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BindKey {
    program: u64,
    textures: [Option<u64>; MAX_TEXTURE_UNITS],
}

struct DrawCommand {
    program: u64,
    mesh: u64,
    key: BindKey,
    uniform_offset: u32,
}

/// wgpu backend implementation
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    // Resource storage
    programs: HashMap<u64, ProgramData>,
    textures: HashMap<u64, TextureEntry>,
    meshes: HashMap<u64, MeshData>,
    bind_groups: HashMap<BindKey, wgpu::BindGroup>,

    // Handle counters
    next_program_id: u64,
    next_texture_id: u64,
    next_mesh_id: u64,

    // Draw state
    active_program: Option<u64>,
    bound_units: [Option<u64>; MAX_TEXTURE_UNITS],
    wireframe: bool,
    supports_line_mode: bool,

    // Per-frame uniform arena with dynamic offsets
    uniform_arena: wgpu::Buffer,
    uniform_align: u32,
    uniform_cursor: u32,
    arena_overflow_logged: bool,

    sampler: wgpu::Sampler,
    fallback_view: wgpu::TextureView,

    // Frame state
    current_frame: Option<wgpu::SurfaceTexture>,
    clear_color: wgpu::Color,
    commands: Vec<DrawCommand>,
}

impl WgpuBackend {
    /// Create a backend rendering to the given window, blocking on device
    /// acquisition.
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let supports_line_mode = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if supports_line_mode {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("litcube device"),
                    required_features,
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = Self::create_depth_view(&device, surface_config.width, surface_config.height);

        let uniform_align = device
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(256);
        let uniform_arena = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform arena"),
            size: UNIFORM_ARENA_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Sampling defaults for every texture: repeat wrap, linear filtering.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("default sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // 1x1 white texture standing in for unbound units.
        let fallback_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fallback white"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &fallback_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let fallback_view = fallback_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            depth_view,
            programs: HashMap::new(),
            textures: HashMap::new(),
            meshes: HashMap::new(),
            bind_groups: HashMap::new(),
            next_program_id: 1,
            next_texture_id: 1,
            next_mesh_id: 1,
            active_program: None,
            bound_units: [None; MAX_TEXTURE_UNITS],
            wireframe: false,
            supports_line_mode,
            uniform_arena,
            uniform_align,
            uniform_cursor: 0,
            arena_overflow_logged: false,
            sampler,
            fallback_view,
            current_frame: None,
            clear_color: wgpu::Color::BLACK,
            commands: Vec::new(),
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        depth.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn build_bind_group_layout(&self, layout: &ProgramLayout) -> wgpu::BindGroupLayout {
        let mut entries = Vec::new();
        if layout.uniform_binding.is_some() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: layout.uniform_binding.unwrap_or(0),
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for binding in &layout.texture_bindings {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: *binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        for binding in &layout.sampler_bindings {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: *binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &entries,
            })
    }

    fn create_pipeline(
        &self,
        vs_module: &wgpu::ShaderModule,
        fs_module: &wgpu::ShaderModule,
        pipeline_layout: &wgpu::PipelineLayout,
        polygon_mode: wgpu::PolygonMode,
        label: &str,
    ) -> wgpu::RenderPipeline {
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vs_module,
                    entry_point: "vs_main",
                    buffers: &[vertex_layout],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fs_module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_config.format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }

    /// Ensure a bind group exists for the program + bound-texture combination.
    fn ensure_bind_group(&mut self, key: BindKey) {
        if self.bind_groups.contains_key(&key) {
            return;
        }
        let Some(program) = self.programs.get(&key.program) else {
            return;
        };

        let mut entries = Vec::new();
        if let Some(binding) = program.layout.uniform_binding {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.uniform_arena,
                    offset: 0,
                    size: NonZeroU64::new(program.layout.block_size as u64),
                }),
            });
        }
        for (unit, binding) in program.layout.texture_bindings.iter().enumerate() {
            let view = key.textures[unit]
                .and_then(|id| self.textures.get(&id))
                .map(|entry| &entry.view)
                .unwrap_or_else(|| {
                    log::warn!(
                        "program '{}': texture unit {} is unbound, using fallback",
                        program.label,
                        unit
                    );
                    &self.fallback_view
                });
            entries.push(wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        for binding in &program.layout.sampler_bindings {
            entries.push(wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label.as_str()),
            layout: &program.bind_group_layout,
            entries: &entries,
        });
        self.bind_groups.insert(key, bind_group);
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        label: Option<&str>,
    ) -> BackendResult<ProgramId> {
        let label = label.unwrap_or("unnamed program");

        let vs_naga = parse_and_validate(vertex_src, "vertex")?;
        let fs_naga = parse_and_validate(fragment_src, "fragment")?;
        require_entry_point(&vs_naga, naga::ShaderStage::Vertex, "vs_main")?;
        require_entry_point(&fs_naga, naga::ShaderStage::Fragment, "fs_main")?;

        let layout = reflect_layout(&[&vs_naga, &fs_naga])?;
        if layout.texture_bindings.len() > MAX_TEXTURE_UNITS {
            return Err(BackendError::LinkFailed(format!(
                "program '{}' declares {} sampled textures, max is {}",
                label,
                layout.texture_bindings.len(),
                MAX_TEXTURE_UNITS
            )));
        }

        let vs_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(vertex_src)),
            });
        let fs_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(fragment_src)),
            });

        let bind_group_layout = self.build_bind_group_layout(&layout);
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        // Pipeline creation is the link step; capture validation errors
        // instead of letting them reach the uncaptured-error handler.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let fill_pipeline = self.create_pipeline(
            &vs_module,
            &fs_module,
            &pipeline_layout,
            wgpu::PolygonMode::Fill,
            label,
        );
        let line_pipeline = if self.supports_line_mode {
            Some(self.create_pipeline(
                &vs_module,
                &fs_module,
                &pipeline_layout,
                wgpu::PolygonMode::Line,
                label,
            ))
        } else {
            None
        };
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::LinkFailed(format!("{label}: {error}")));
        }

        let staging = vec![0u8; layout.block_size as usize];
        let id = self.next_program_id;
        self.next_program_id += 1;
        self.programs.insert(
            id,
            ProgramData {
                fill_pipeline,
                line_pipeline,
                bind_group_layout,
                layout,
                staging,
                label: label.to_string(),
            },
        );

        log::debug!("compiled program '{}' as {}", label, id);
        Ok(ProgramId(id))
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(&program.0) {
            log::warn!("use_program on unknown program {}", program.0);
            return;
        }
        self.active_program = Some(program.0);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        let Some(data) = self.programs.get_mut(&program.0) else {
            log::warn!("uniform '{}' set on unknown program {}", name, program.0);
            return;
        };
        // Resolved by name on every call, mirroring the GL location lookup.
        let Some(member) = data.layout.members.get(name) else {
            log::warn!("program '{}': no active uniform named '{}'", data.label, name);
            return;
        };
        if value.size() != member.size as usize {
            log::warn!(
                "program '{}': uniform '{}' is {} bytes, got {}",
                data.label,
                name,
                member.size,
                value.size()
            );
            return;
        }
        let start = member.offset as usize;
        value.write_to(&mut data.staging[start..start + member.size as usize]);
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

        // wgpu has no 3-channel format; RGB rows are widened to RGBA on upload.
        let rgba_storage;
        let rgba: &[u8] = match desc.format {
            PixelFormat::Rgba => pixels,
            PixelFormat::Rgb => {
                let mut out = Vec::with_capacity((desc.width * desc.height * 4) as usize);
                for px in pixels.chunks_exact(3) {
                    out.extend_from_slice(px);
                    out.push(255);
                }
                rgba_storage = out;
                &rgba_storage
            }
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * 4),
                rows_per_image: Some(desc.height),
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.next_texture_id;
        self.next_texture_id += 1;
        self.textures.insert(id, TextureEntry { texture, view });
        Ok(TextureId(id))
    }

    fn bind_texture(&mut self, texture: TextureId, unit: u32) {
        if unit as usize >= MAX_TEXTURE_UNITS {
            log::warn!("texture unit {} out of range", unit);
            return;
        }
        if !self.textures.contains_key(&texture.0) {
            log::warn!("bind_texture on unknown texture {}", texture.0);
            return;
        }
        self.bound_units[unit as usize] = Some(texture.0);
    }

    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
        label: Option<&str>,
    ) -> BackendResult<MeshId> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(BackendError::MeshCreationFailed(
                "empty vertex or index data".into(),
            ));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(
            id,
            MeshData {
                vertex_buffer,
                index_buffer,
                index_count: indices.len() as u32,
            },
        );
        Ok(MeshId(id))
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program.0).is_none() {
            log::warn!(
                "destroy_program on already-destroyed program {}",
                program.0
            );
            return;
        }
        self.bind_groups.retain(|key, _| key.program != program.0);
        if self.active_program == Some(program.0) {
            self.active_program = None;
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_none() {
            log::warn!(
                "destroy_texture on already-destroyed texture {}",
                texture.0
            );
            return;
        }
        self.bind_groups
            .retain(|key, _| !key.textures.contains(&Some(texture.0)));
        for slot in self.bound_units.iter_mut() {
            if *slot == Some(texture.0) {
                *slot = None;
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let max_size = self.device.limits().max_texture_dimension_2d;
        self.surface_config.width = width.min(max_size);
        self.surface_config.height = height.min(max_size);
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = Self::create_depth_view(
            &self.device,
            self.surface_config.width,
            self.surface_config.height,
        );
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn set_wireframe(&mut self, enabled: bool) {
        if enabled && !self.supports_line_mode {
            log::warn!("wireframe requested but the device lacks line polygon mode");
            return;
        }
        self.wireframe = enabled;
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> BackendResult<()> {
        let frame = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost => BackendError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
            _ => BackendError::AcquireFrameFailed(e.to_string()),
        })?;

        self.current_frame = Some(frame);
        self.clear_color = wgpu::Color {
            r: clear_color[0] as f64,
            g: clear_color[1] as f64,
            b: clear_color[2] as f64,
            a: clear_color[3] as f64,
        };
        self.commands.clear();
        self.uniform_cursor = 0;
        self.arena_overflow_logged = false;
        Ok(())
    }

    fn draw_mesh(&mut self, mesh: MeshId) {
        let Some(program_id) = self.active_program else {
            log::warn!("draw_mesh with no active program");
            return;
        };
        let Some(program) = self.programs.get(&program_id) else {
            return;
        };
        if !self.meshes.contains_key(&mesh.0) {
            log::warn!("draw_mesh on unknown mesh {}", mesh.0);
            return;
        }

        // Snapshot the uniform block into the arena so later writes don't
        // disturb draws already recorded this frame.
        let mut uniform_offset = 0;
        if program.layout.uniform_binding.is_some() {
            let block_size = program.layout.block_size;
            if self.uniform_cursor + block_size > UNIFORM_ARENA_SIZE as u32 {
                if !self.arena_overflow_logged {
                    log::warn!("uniform arena exhausted, dropping draws for this frame");
                    self.arena_overflow_logged = true;
                }
                return;
            }
            uniform_offset = self.uniform_cursor;
            self.queue
                .write_buffer(&self.uniform_arena, uniform_offset as u64, &program.staging);
            let step = block_size.div_ceil(self.uniform_align) * self.uniform_align;
            self.uniform_cursor += step;
        }

        let mut key = BindKey {
            program: program_id,
            textures: [None; MAX_TEXTURE_UNITS],
        };
        for unit in 0..program.layout.texture_bindings.len() {
            key.textures[unit] = self.bound_units[unit];
        }

        self.ensure_bind_group(key);
        self.commands.push(DrawCommand {
            program: program_id,
            mesh: mesh.0,
            key,
            uniform_offset,
        });
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let Some(frame) = self.current_frame.take() else {
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for cmd in &self.commands {
                let Some(program) = self.programs.get(&cmd.program) else {
                    continue;
                };
                let Some(mesh) = self.meshes.get(&cmd.mesh) else {
                    continue;
                };
                let Some(bind_group) = self.bind_groups.get(&cmd.key) else {
                    continue;
                };

                let pipeline = if self.wireframe {
                    program.line_pipeline.as_ref().unwrap_or(&program.fill_pipeline)
                } else {
                    &program.fill_pipeline
                };
                render_pass.set_pipeline(pipeline);
                if program.layout.uniform_binding.is_some() {
                    render_pass.set_bind_group(0, bind_group, &[cmd.uniform_offset]);
                } else {
                    render_pass.set_bind_group(0, bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.commands.clear();
        Ok(())
    }
}

/// Parse and validate one WGSL stage, mapping failures to compile errors.
fn parse_and_validate(source: &str, stage: &str) -> BackendResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        BackendError::CompileFailed(format!("{} stage: {}", stage, e.emit_to_string(source)))
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator.validate(&module).map_err(|e| {
        BackendError::CompileFailed(format!("{} stage: {}", stage, e.emit_to_string(source)))
    })?;

    Ok(module)
}

fn require_entry_point(
    module: &naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> BackendResult<()> {
    if module
        .entry_points
        .iter()
        .any(|ep| ep.stage == stage && ep.name == name)
    {
        Ok(())
    } else {
        Err(BackendError::CompileFailed(format!(
            "missing `{}` entry point",
            name
        )))
    }
}

/// Collect the group-0 resource interface of a program from its stage
/// modules. Stages sharing a uniform block must declare the same layout.
fn reflect_layout(modules: &[&naga::Module]) -> BackendResult<ProgramLayout> {
    let mut layout = ProgramLayout::default();

    for module in modules {
        let gctx = module.to_ctx();
        for (_, var) in module.global_variables.iter() {
            let Some(binding) = &var.binding else {
                continue;
            };
            let var_name = var.name.as_deref().unwrap_or("<unnamed>");
            if binding.group != 0 {
                return Err(BackendError::LinkFailed(format!(
                    "resource '{}' uses bind group {}; only group 0 is supported",
                    var_name, binding.group
                )));
            }

            match &module.types[var.ty].inner {
                naga::TypeInner::Struct { members, span }
                    if var.space == naga::AddressSpace::Uniform =>
                {
                    if let Some(existing) = layout.uniform_binding {
                        if existing != binding.binding {
                            return Err(BackendError::LinkFailed(format!(
                                "uniform blocks at bindings {} and {}; a program may declare only one",
                                existing, binding.binding
                            )));
                        }
                    }
                    layout.uniform_binding = Some(binding.binding);
                    layout.block_size = layout.block_size.max(*span);
                    for member in members {
                        let Some(member_name) = &member.name else {
                            continue;
                        };
                        layout.members.insert(
                            member_name.clone(),
                            UniformMember {
                                offset: member.offset,
                                size: module.types[member.ty].inner.size(gctx),
                            },
                        );
                    }
                }
                naga::TypeInner::Image { .. } => {
                    if !layout.texture_bindings.contains(&binding.binding) {
                        layout.texture_bindings.push(binding.binding);
                    }
                }
                naga::TypeInner::Sampler { .. } => {
                    if !layout.sampler_bindings.contains(&binding.binding) {
                        layout.sampler_bindings.push(binding.binding);
                    }
                }
                _ => {
                    return Err(BackendError::LinkFailed(format!(
                        "resource '{}' has an unsupported binding type",
                        var_name
                    )));
                }
            }
        }
    }

    layout.texture_bindings.sort_unstable();
    layout.sampler_bindings.sort_unstable();
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_VS: &str = r#"
struct Params {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    light_position: vec3<f32>,
    view_position: vec3<f32>,
    shininess: f32,
};

@group(0) @binding(0) var<uniform> params: Params;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return params.projection * params.view * params.model * vec4<f32>(position, 1.0);
}
"#;

    const TEXTURED_FS: &str = r#"
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;
@group(0) @binding(3) var t_specular: texture_2d<f32>;
@group(0) @binding(4) var s_specular: sampler;

@fragment
fn fs_main(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = pos.xy / 800.0;
    return textureSample(t_diffuse, s_diffuse, uv) + textureSample(t_specular, s_specular, uv);
}
"#;

    #[test]
    fn reflects_uniform_block_members() {
        let module = parse_and_validate(BLOCK_VS, "vertex").unwrap();
        let layout = reflect_layout(&[&module]).unwrap();

        assert_eq!(layout.uniform_binding, Some(0));
        assert_eq!(
            layout.members.get("model"),
            Some(&UniformMember { offset: 0, size: 64 })
        );
        assert_eq!(
            layout.members.get("light_position"),
            Some(&UniformMember { offset: 192, size: 12 })
        );
        // vec3 members align to 16 in the uniform address space.
        assert_eq!(
            layout.members.get("view_position"),
            Some(&UniformMember { offset: 208, size: 12 })
        );
        assert_eq!(
            layout.members.get("shininess"),
            Some(&UniformMember { offset: 220, size: 4 })
        );
        assert!(layout.members.get("missing").is_none());
    }

    #[test]
    fn reflects_texture_units_in_binding_order() {
        let module = parse_and_validate(TEXTURED_FS, "fragment").unwrap();
        let layout = reflect_layout(&[&module]).unwrap();

        assert_eq!(layout.texture_bindings, vec![1, 3]);
        assert_eq!(layout.sampler_bindings, vec![2, 4]);
        assert_eq!(layout.uniform_binding, None);
    }

    #[test]
    fn merges_stage_interfaces() {
        let vs = parse_and_validate(BLOCK_VS, "vertex").unwrap();
        let fs = parse_and_validate(TEXTURED_FS, "fragment").unwrap();
        let layout = reflect_layout(&[&vs, &fs]).unwrap();

        assert_eq!(layout.uniform_binding, Some(0));
        assert_eq!(layout.texture_bindings, vec![1, 3]);
        assert!(layout.members.contains_key("model"));
    }

    #[test]
    fn rejects_invalid_wgsl() {
        let err = parse_and_validate("not a shader", "vertex").unwrap_err();
        assert!(matches!(err, BackendError::CompileFailed(_)));
    }

    #[test]
    fn rejects_missing_entry_point() {
        let module = parse_and_validate(TEXTURED_FS, "fragment").unwrap();
        assert!(require_entry_point(&module, naga::ShaderStage::Vertex, "vs_main").is_err());
        assert!(require_entry_point(&module, naga::ShaderStage::Fragment, "fs_main").is_ok());
    }

    #[test]
    fn rejects_non_zero_bind_group() {
        let src = r#"
@group(1) @binding(0) var<uniform> scale: f32;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position * scale, 1.0);
}
"#;
        let module = parse_and_validate(src, "vertex").unwrap();
        let err = reflect_layout(&[&module]).unwrap_err();
        assert!(matches!(err, BackendError::LinkFailed(_)));
    }
}
