// ============================================================================
// GPU MODULE: optional wgpu backend for the compositor
// ============================================================================
//
// Everything in here is driven by `compositor::Compositor`.  When no adapter
// can be created (or `gpu_acceleration = false`) the compositor renders the
// same passes on the CPU and this module stays idle.

pub mod context;
pub mod pipelines;
pub mod renderer;
pub mod shaders;
pub mod texture;

pub use pipelines::{PassKind, PassUniforms};
pub use renderer::{GpuPass, GpuRenderer};
pub use texture::LayerTexture;
