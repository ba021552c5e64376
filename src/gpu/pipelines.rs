// ============================================================================
// GPU PIPELINES: one render pipeline per compositor pass
// ============================================================================

use bytemuck::{Pod, Zeroable};

use super::shaders;

/// Uniform block shared by every pass.  Layout mirrors `PassUniforms` in
/// the WGSL prelude (48 bytes, 16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PassUniforms {
    pub resolution: [f32; 2],
    pub pan: [f32; 2],
    /// Document-space rectangle the pass is about (layer quad or overlay).
    pub rect_offset: [f32; 2],
    pub rect_size: [f32; 2],
    pub zoom: f32,
    /// Checkerboard brightness multiplier.
    pub brightness: f32,
    /// Layer-bounds band thickness in rect-local units.
    pub band: [f32; 2],
}

/// The compositor's passes, in the order they are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Background,
    Layer,
    SelectionEdge,
    LayerBounds,
}

impl PassKind {
    /// Whether the pass binds a texture at group 1.
    pub fn needs_texture(self) -> bool {
        matches!(self, PassKind::Layer | PassKind::SelectionEdge)
    }
}

pub struct Pipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub sampler_nearest: wgpu::Sampler,
    background: wgpu::RenderPipeline,
    layer: wgpu::RenderPipeline,
    selection_edge: wgpu::RenderPipeline,
    layer_bounds: wgpu::RenderPipeline,
}

impl Pipelines {
    pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer_texture_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler_nearest = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler_nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("plain_pass_layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("textured_pass_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let background = Self::build(
            device,
            "background",
            &shaders::module_source(shaders::BACKGROUND_SHADER, false),
            &plain_layout,
            ("vs_fullscreen", "fs_background"),
            None,
        );
        let layer = Self::build(
            device,
            "layer",
            &shaders::module_source(shaders::LAYER_SHADER, false),
            &textured_layout,
            ("vs_layer", "fs_layer"),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        );
        let selection_edge = Self::build(
            device,
            "selection_edge",
            &shaders::module_source(shaders::SELECTION_EDGE_SHADER, true),
            &textured_layout,
            ("vs_fullscreen", "fs_selection_edge"),
            None,
        );
        let layer_bounds = Self::build(
            device,
            "layer_bounds",
            &shaders::module_source(shaders::LAYER_BOUNDS_SHADER, true),
            &plain_layout,
            ("vs_fullscreen", "fs_layer_bounds"),
            None,
        );

        Self {
            uniform_layout,
            texture_layout,
            sampler_nearest,
            background,
            layer,
            selection_edge,
            layer_bounds,
        }
    }

    pub fn get(&self, kind: PassKind) -> &wgpu::RenderPipeline {
        match kind {
            PassKind::Background => &self.background,
            PassKind::Layer => &self.layer,
            PassKind::SelectionEdge => &self.selection_edge,
            PassKind::LayerBounds => &self.layer_bounds,
        }
    }

    fn build(
        device: &wgpu::Device,
        label: &str,
        source: &str,
        layout: &wgpu::PipelineLayout,
        (vs_entry, fs_entry): (&str, &str),
        blend: Option<wgpu::BlendState>,
    ) -> wgpu::RenderPipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: vs_entry,
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: fs_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: Self::TARGET_FORMAT,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<PassUniforms>(), 48);
        assert_eq!(std::mem::size_of::<PassUniforms>() % 16, 0);
    }

    #[test]
    fn only_layer_and_selection_bind_textures() {
        assert!(PassKind::Layer.needs_texture());
        assert!(PassKind::SelectionEdge.needs_texture());
        assert!(!PassKind::Background.needs_texture());
        assert!(!PassKind::LayerBounds.needs_texture());
    }
}
