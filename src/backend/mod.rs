//! GPU backend abstraction layer
//!
//! Provides the [`RenderBackend`] trait the resource cache and demo loop call
//! into, plus its implementations:
//!
//! - `null` (feature `null-backend`, default): recording backend for tests
//!   and headless runs
//! - `wgpu_backend` (feature `wgpu-backend`, default): real GPU backend over
//!   wgpu

pub mod traits;
pub mod types;

#[cfg(feature = "null-backend")]
pub mod null;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub use traits::*;
pub use types::*;
