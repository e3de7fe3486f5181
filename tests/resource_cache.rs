//! Integration tests for the resource cache lifecycle.
//!
//! These drive the public API against the recording backend, so the whole
//! load/lookup/overwrite/teardown contract is verified without GPU hardware.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec2, Vec3, Vec4};
use litcube::backend::null::NullBackend;
use litcube::backend::{BackendError, PixelFormat, UniformValue};
use litcube::resources::{ResourceCache, ResourceError, TextureData};

/// Per-test fixture directory under the system temp dir.
fn fixture_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("litcube-tests-{}", std::process::id()))
        .join(test);
    fs::create_dir_all(&dir).expect("failed to create fixture dir");
    dir
}

/// Write a vertex + fragment source pair. The null backend accepts any
/// non-empty text.
fn write_shader_pair(dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    let vertex = dir.join(format!("{stem}.vert.wgsl"));
    let fragment = dir.join(format!("{stem}.frag.wgsl"));
    fs::write(&vertex, "// vertex stage\n").unwrap();
    fs::write(&fragment, "// fragment stage\n").unwrap();
    (vertex, fragment)
}

fn write_png(path: &Path, width: u32, height: u32, color: image::ColorType) {
    let channels = color.channel_count() as u32;
    let data = vec![127u8; (width * height * channels) as usize];
    image::save_buffer(path, &data, width, height, color).expect("failed to encode fixture png");
}

#[test]
fn load_then_get_returns_the_same_program() {
    let dir = fixture_dir("load_then_get");
    let (vertex, fragment) = write_shader_pair(&dir, "basic");

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let loaded_id = cache
        .load_shader(&mut backend, &vertex, &fragment, "basic")
        .expect("load should succeed")
        .id;

    let fetched = cache.get_shader("basic").expect("entry should exist");
    assert_eq!(fetched.id, loaded_id);
    assert_eq!(fetched.name(), "basic");
    assert_eq!(cache.shader_count(), 1);

    cache.clear(&mut backend);
}

#[test]
fn reloading_a_name_keeps_one_entry_and_destroys_the_old_program() {
    let dir = fixture_dir("reload_shader");
    let (vertex, fragment) = write_shader_pair(&dir, "basic");

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let first = cache
        .load_shader(&mut backend, &vertex, &fragment, "basic")
        .unwrap()
        .id;
    let second = cache
        .load_shader(&mut backend, &vertex, &fragment, "basic")
        .unwrap()
        .id;

    assert_ne!(first, second);
    assert_eq!(cache.shader_count(), 1);
    assert_eq!(cache.get_shader("basic").unwrap().id, second);

    // The replaced program's backend object is gone, the new one is live.
    assert_eq!(backend.program_destroy_count(first), 1);
    assert_eq!(backend.program_destroy_count(second), 0);
    assert_eq!(backend.live_program_count(), 1);

    cache.clear(&mut backend);
}

#[test]
fn missing_shader_file_is_a_file_not_found_error() {
    let dir = fixture_dir("missing_shader");
    let (vertex, _) = write_shader_pair(&dir, "basic");

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let err = cache
        .load_shader(&mut backend, &vertex, &dir.join("nope.frag.wgsl"), "basic")
        .unwrap_err();

    assert!(matches!(err, ResourceError::FileNotFound { .. }));
    assert!(err.to_string().contains("nope.frag.wgsl"));
    assert_eq!(cache.shader_count(), 0);
    assert_eq!(backend.programs_created(), 0);
}

#[test]
fn failed_reload_keeps_the_existing_entry_alive() {
    let dir = fixture_dir("failed_reload");
    let (vertex, fragment) = write_shader_pair(&dir, "basic");
    let empty = dir.join("empty.vert.wgsl");
    fs::write(&empty, "").unwrap();

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let first = cache
        .load_shader(&mut backend, &vertex, &fragment, "basic")
        .unwrap()
        .id;

    let err = cache
        .load_shader(&mut backend, &empty, &fragment, "basic")
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Backend(BackendError::CompileFailed(_))
    ));

    // The old entry survives a failed replacement untouched.
    assert_eq!(cache.get_shader("basic").unwrap().id, first);
    assert_eq!(backend.program_destroy_count(first), 0);
    assert_eq!(backend.live_program_count(), 1);

    cache.clear(&mut backend);
}

#[test]
fn get_never_inserts_on_a_miss() {
    let cache = ResourceCache::new();

    assert!(cache.get_shader("ghost").is_none());
    assert!(cache.get_texture("ghost").is_none());
    assert_eq!(cache.shader_count(), 0);
    assert_eq!(cache.texture_count(), 0);

    // Still a miss afterwards; lookups have no side effects.
    assert!(cache.get_shader("ghost").is_none());
    assert_eq!(cache.shader_count(), 0);
}

#[test]
fn texture_format_follows_channel_count_and_force_alpha() {
    let dir = fixture_dir("texture_formats");
    let rgb = dir.join("rgb.png");
    let rgba = dir.join("rgba.png");
    write_png(&rgb, 4, 4, image::ColorType::Rgb8);
    write_png(&rgba, 4, 4, image::ColorType::Rgba8);

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let tex = cache
        .load_texture(&mut backend, &rgb, false, "rgb")
        .unwrap();
    assert_eq!(tex.format, PixelFormat::Rgb);
    assert_eq!((tex.width, tex.height), (4, 4));

    let tex = cache
        .load_texture(&mut backend, &rgb, true, "rgb_forced")
        .unwrap();
    assert_eq!(tex.format, PixelFormat::Rgba);

    let tex = cache
        .load_texture(&mut backend, &rgba, false, "rgba")
        .unwrap();
    assert_eq!(tex.format, PixelFormat::Rgba);

    // The upload the backend saw matches the declared format.
    let record = backend.texture_record(cache.get_texture("rgb").unwrap().id).unwrap();
    assert_eq!(record.format, PixelFormat::Rgb);
    assert_eq!(record.byte_len, 4 * 4 * 3);

    cache.clear(&mut backend);
}

#[test]
fn missing_texture_file_is_an_error_and_uploads_nothing() {
    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let err = cache
        .load_texture(&mut backend, "does/not/exist.png", false, "x")
        .unwrap_err();

    assert!(matches!(err, ResourceError::DecodeFailure { .. }));
    assert_eq!(cache.texture_count(), 0);
    assert!(cache.get_texture("x").is_none());
    assert_eq!(backend.textures_created(), 0);
}

#[test]
fn fallback_texture_can_replace_a_failed_load() {
    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    assert!(cache
        .load_texture(&mut backend, "does/not/exist.png", false, "container")
        .is_err());

    let fallback = TextureData::checkerboard(16, [255, 0, 0, 255], [0, 0, 0, 255]);
    cache
        .add_texture(&mut backend, &fallback, "container")
        .unwrap();

    let tex = cache.get_texture("container").unwrap();
    assert_eq!(tex.format, PixelFormat::Rgba);
    assert_eq!((tex.width, tex.height), (16, 16));

    cache.clear(&mut backend);
}

#[test]
fn shader_and_texture_namespaces_are_independent() {
    let dir = fixture_dir("namespaces");
    let (vertex, fragment) = write_shader_pair(&dir, "tex");
    let png = dir.join("tex.png");
    write_png(&png, 2, 2, image::ColorType::Rgba8);

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    cache
        .load_shader(&mut backend, &vertex, &fragment, "tex")
        .unwrap();
    cache.load_texture(&mut backend, &png, false, "tex").unwrap();

    assert!(cache.get_shader("tex").is_some());
    assert!(cache.get_texture("tex").is_some());
    assert_eq!(cache.shader_count(), 1);
    assert_eq!(cache.texture_count(), 1);

    cache.clear(&mut backend);
}

#[test]
fn clear_destroys_every_entry_exactly_once() {
    let dir = fixture_dir("clear");
    let (vertex, fragment) = write_shader_pair(&dir, "basic");
    let png = dir.join("tex.png");
    write_png(&png, 2, 2, image::ColorType::Rgba8);

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let shader_a = cache
        .load_shader(&mut backend, &vertex, &fragment, "a")
        .unwrap()
        .id;
    let shader_b = cache
        .load_shader(&mut backend, &vertex, &fragment, "b")
        .unwrap()
        .id;
    let texture = cache
        .load_texture(&mut backend, &png, false, "tex")
        .unwrap()
        .id;

    cache.clear(&mut backend);

    assert_eq!(backend.program_destroy_count(shader_a), 1);
    assert_eq!(backend.program_destroy_count(shader_b), 1);
    assert_eq!(backend.texture_destroy_count(texture), 1);
    assert_eq!(backend.live_program_count(), 0);
    assert_eq!(backend.live_texture_count(), 0);

    // Lookups after a clear report absence instead of dangling handles.
    assert!(cache.get_shader("a").is_none());
    assert!(cache.get_texture("tex").is_none());

    // A second clear destroys nothing further.
    cache.clear(&mut backend);
    assert_eq!(backend.program_destroy_count(shader_a), 1);
    assert_eq!(backend.texture_destroy_count(texture), 1);
}

#[test]
fn uniform_writes_reach_the_backend_by_name() {
    let dir = fixture_dir("uniforms");
    let (vertex, fragment) = write_shader_pair(&dir, "basic");

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let program = cache
        .load_shader(&mut backend, &vertex, &fragment, "basic")
        .unwrap()
        .clone();

    let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    program.bind(&mut backend);
    program.set_mat4(&mut backend, "model", model);
    program.set_vec3(&mut backend, "light_position", Vec3::new(1.2, 1.0, 2.0));
    program.set_float(&mut backend, "shininess", 32.0);
    program.set_int(&mut backend, "mode", 2);
    program.set_vec2(&mut backend, "resolution", Vec2::new(800.0, 600.0));
    program.set_vec4(&mut backend, "tint", Vec4::ONE);

    assert_eq!(backend.active_program(), Some(program.id));
    assert_eq!(
        backend.uniform(program.id, "model"),
        Some(UniformValue::Mat4(model))
    );
    assert_eq!(
        backend.uniform(program.id, "light_position"),
        Some(UniformValue::Vec3(Vec3::new(1.2, 1.0, 2.0)))
    );
    assert_eq!(
        backend.uniform(program.id, "shininess"),
        Some(UniformValue::Float(32.0))
    );
    assert_eq!(backend.uniform(program.id, "mode"), Some(UniformValue::Int(2)));
    assert_eq!(
        backend.uniform(program.id, "resolution"),
        Some(UniformValue::Vec2(Vec2::new(800.0, 600.0)))
    );
    assert_eq!(
        backend.uniform(program.id, "tint"),
        Some(UniformValue::Vec4(Vec4::ONE))
    );
    assert_eq!(backend.uniform(program.id, "missing"), None);

    cache.clear(&mut backend);
}

#[test]
fn textures_bind_to_the_requested_unit() {
    let dir = fixture_dir("bind_units");
    let diffuse_png = dir.join("diffuse.png");
    let specular_png = dir.join("specular.png");
    write_png(&diffuse_png, 2, 2, image::ColorType::Rgba8);
    write_png(&specular_png, 2, 2, image::ColorType::Rgba8);

    let mut backend = NullBackend::new();
    let mut cache = ResourceCache::new();

    let diffuse = cache
        .load_texture(&mut backend, &diffuse_png, true, "diffuse")
        .unwrap()
        .clone();
    let specular = cache
        .load_texture(&mut backend, &specular_png, true, "specular")
        .unwrap()
        .clone();

    diffuse.bind(&mut backend, 0);
    specular.bind(&mut backend, 1);

    assert_eq!(backend.bound_texture(0), Some(diffuse.id));
    assert_eq!(backend.bound_texture(1), Some(specular.id));

    // Destroying a texture releases its unit.
    cache.clear(&mut backend);
    assert_eq!(backend.bound_texture(0), None);
    assert_eq!(backend.bound_texture(1), None);
}
