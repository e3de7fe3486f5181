//! Demo application: a textured, Phong-lit cube with a moving point light
//!
//! Run with:
//!   cargo run --bin demo
//!
//! Controls:
//!   WASD     - Move camera
//!   QE       - Move down/up
//!   Shift    - Sprint (2x speed)
//!   Mouse    - Look around
//!   Scroll   - Adjust speed
//!   Space    - Toggle wireframe
//!   Escape   - Exit

use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};
use litcube::backend::wgpu_backend::WgpuBackend;
use litcube::backend::{MeshId, RenderBackend};
use litcube::resources::{Mesh, ResourceCache, TextureData};
use litcube::scene::{Camera, CameraInput, FreeFlyController, PointLight};
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, WindowBuilder},
};

const SCR_WIDTH: u32 = 800;
const SCR_HEIGHT: u32 = 600;
const CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.3, 1.0];

/// Application state for input handling and the scene
struct AppState {
    camera: Camera,
    camera_input: CameraInput,
    controller: FreeFlyController,
    light: PointLight,
    wireframe: bool,
    last_frame: Instant,
    start: Instant,
}

impl AppState {
    fn new() -> Self {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO);
        let mut controller = FreeFlyController::new().with_speed(5.0);
        controller.sync_with_camera(&camera);

        Self {
            camera,
            camera_input: CameraInput::new(),
            controller,
            light: PointLight::default(),
            wireframe: false,
            last_frame: Instant::now(),
            start: Instant::now(),
        }
    }
}

fn main() {
    env_logger::init();

    println!("Controls:");
    println!("  WASD   - Move camera");
    println!("  Q/E    - Move down/up");
    println!("  Shift  - Sprint (2x speed)");
    println!("  Mouse  - Look around");
    println!("  Scroll - Adjust speed");
    println!("  Space  - Toggle wireframe");
    println!("  Escape - Exit");
    println!();

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("litcube")
            .with_inner_size(PhysicalSize::new(SCR_WIDTH, SCR_HEIGHT))
            .build(&event_loop)
            .expect("Failed to create window"),
    );

    if window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        .is_err()
    {
        log::warn!("cursor grab is not available; mouse look may escape the window");
    }
    window.set_cursor_visible(false);

    let mut backend = match WgpuBackend::new(Arc::clone(&window), true) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Failed to create render backend: {e}");
            return;
        }
    };

    let mut cache = ResourceCache::new();
    if let Err(e) = cache.load_shader(
        &mut backend,
        "assets/shaders/material.vert.wgsl",
        "assets/shaders/material.frag.wgsl",
        "material",
    ) {
        eprintln!("Failed to load material shader: {e}");
        return;
    }
    if let Err(e) = cache.load_shader(
        &mut backend,
        "assets/shaders/lamp.vert.wgsl",
        "assets/shaders/lamp.frag.wgsl",
        "lamp",
    ) {
        eprintln!("Failed to load lamp shader: {e}");
        return;
    }

    load_texture_or_fallback(
        &mut cache,
        &mut backend,
        "assets/textures/container.png",
        "container",
        TextureData::checkerboard(64, [172, 114, 68, 255], [32, 32, 32, 255]),
    );
    load_texture_or_fallback(
        &mut cache,
        &mut backend,
        "assets/textures/container_specular.png",
        "container_specular",
        TextureData::solid_color([110, 110, 110, 255], "specular_fallback"),
    );

    let cube = match Mesh::cube().upload(&mut backend) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("Failed to upload cube mesh: {e}");
            return;
        }
    };

    let mut state = AppState::new();
    state
        .camera
        .set_aspect(SCR_WIDTH as f32, SCR_HEIGHT as f32);

    let window_clone = Arc::clone(&window);
    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        cache.clear(&mut backend);
                        elwt.exit();
                    }
                    WindowEvent::Resized(size) => {
                        backend.resize(size.width, size.height);
                        state
                            .camera
                            .set_aspect(size.width as f32, size.height as f32);
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                physical_key: PhysicalKey::Code(code),
                                state: key_state,
                                repeat,
                                ..
                            },
                        ..
                    } => {
                        if code == KeyCode::Escape && key_state == ElementState::Pressed {
                            cache.clear(&mut backend);
                            elwt.exit();
                        } else {
                            handle_key(&mut state, &mut backend, code, key_state, repeat);
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        state.camera_input.scroll_delta += match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                        };
                    }
                    WindowEvent::RedrawRequested => {
                        render_frame(&mut backend, &cache, cube, &mut state);
                    }
                    _ => {}
                },
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } => {
                    state.camera_input.mouse_delta +=
                        Vec2::new(delta.0 as f32, delta.1 as f32);
                }
                Event::AboutToWait => {
                    window_clone.request_redraw();
                }
                _ => {}
            }
        })
        .expect("Event loop failed");
}

/// Load a texture into the cache, substituting a generated fallback if the
/// file is missing or undecodable. A bad asset never aborts the demo.
fn load_texture_or_fallback(
    cache: &mut ResourceCache,
    backend: &mut WgpuBackend,
    path: &str,
    name: &str,
    fallback: TextureData,
) {
    if let Err(e) = cache.load_texture(backend, path, true, name) {
        log::error!("failed to load texture '{name}': {e}; substituting '{}'", fallback.name);
        if let Err(e) = cache.add_texture(backend, &fallback, name) {
            log::error!("failed to upload fallback texture for '{name}': {e}");
        }
    }
}

fn handle_key(
    state: &mut AppState,
    backend: &mut WgpuBackend,
    code: KeyCode,
    key_state: ElementState,
    repeat: bool,
) {
    let pressed = key_state == ElementState::Pressed;
    let input = &mut state.camera_input;

    match code {
        KeyCode::KeyW => input.forward = pressed,
        KeyCode::KeyS => input.backward = pressed,
        KeyCode::KeyA => input.left = pressed,
        KeyCode::KeyD => input.right = pressed,
        KeyCode::KeyQ => input.down = pressed,
        KeyCode::KeyE => input.up = pressed,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => input.sprint = pressed,
        KeyCode::Space => {
            if pressed && !repeat {
                state.wireframe = !state.wireframe;
                backend.set_wireframe(state.wireframe);
            }
        }
        _ => {}
    }
}

fn render_frame(
    backend: &mut WgpuBackend,
    cache: &ResourceCache,
    cube: MeshId,
    state: &mut AppState,
) {
    let now = Instant::now();
    let dt = (now - state.last_frame).as_secs_f32();
    state.last_frame = now;

    state
        .controller
        .update(&mut state.camera, &state.camera_input, dt);
    state.camera_input.reset_deltas();

    let t = state.start.elapsed().as_secs_f32();
    state.light.orbit(t);

    if let Err(e) = backend.begin_frame(CLEAR_COLOR) {
        log::warn!("skipping frame: {e}");
        let (width, height) = backend.surface_size();
        backend.resize(width, height);
        return;
    }

    let view = state.camera.view_matrix();
    let projection = state.camera.projection_matrix();

    // Rotating lit cube
    if let Some(material) = cache.get_shader("material") {
        material.bind(backend);
        material.set_mat4(
            backend,
            "model",
            Mat4::from_axis_angle(Vec3::new(0.5, 1.0, 0.0).normalize(), t),
        );
        material.set_mat4(backend, "view", view);
        material.set_mat4(backend, "projection", projection);
        material.set_vec3(backend, "light_position", state.light.position);
        material.set_vec3(backend, "view_position", state.camera.position);
        material.set_vec3(backend, "light_ambient", state.light.ambient_color());
        material.set_vec3(backend, "light_diffuse", state.light.diffuse_color());
        material.set_vec3(backend, "light_specular", state.light.specular_color());
        material.set_float(backend, "shininess", 32.0);

        if let Some(diffuse) = cache.get_texture("container") {
            diffuse.bind(backend, 0);
        }
        if let Some(specular) = cache.get_texture("container_specular") {
            specular.bind(backend, 1);
        }
        backend.draw_mesh(cube);
    }

    // Lamp cube at the light's position
    if let Some(lamp) = cache.get_shader("lamp") {
        lamp.bind(backend);
        let model =
            Mat4::from_translation(state.light.position) * Mat4::from_scale(Vec3::splat(0.2));
        lamp.set_mat4(backend, "model", model);
        lamp.set_mat4(backend, "view", view);
        lamp.set_mat4(backend, "projection", projection);
        lamp.set_vec3(backend, "light_color", state.light.color);
        backend.draw_mesh(cube);
    }

    if let Err(e) = backend.end_frame() {
        log::warn!("failed to present frame: {e}");
    }
}
