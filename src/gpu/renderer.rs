// ============================================================================
// GPU RENDERER: offscreen target, pass submission and readback
// ============================================================================

use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::pipelines::{PassKind, PassUniforms, Pipelines};
use super::texture::LayerTexture;
use crate::error::{EditorError, Result};

/// One draw in a frame.  Textured passes carry the texture they sample.
pub struct GpuPass<'a> {
    pub kind: PassKind,
    pub uniforms: PassUniforms,
    pub texture: Option<&'a LayerTexture>,
}

/// Owns the device-side half of the compositor.
pub struct GpuRenderer {
    pub ctx: GpuContext,
    pipelines: Pipelines,
    /// Offscreen colour target, recreated when the surface size changes.
    target: Option<(wgpu::Texture, u32, u32)>,
    /// Reused MAP_READ staging buffer and its size.
    staging: Option<(wgpu::Buffer, u64)>,
}

impl GpuRenderer {
    /// Bring up a device and build the pass pipelines.
    pub fn try_new(preferred_gpu: &str) -> Option<Self> {
        let ctx = GpuContext::new(preferred_gpu)?;
        let pipelines = Pipelines::new(&ctx.device);
        Some(Self {
            ctx,
            pipelines,
            target: None,
            staging: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.ctx.adapter_name
    }

    pub fn supports_size(&self, width: u32, height: u32) -> bool {
        self.ctx.supports_size(width, height)
    }

    /// Bring `slot` in line with `data`: reuse the texture when the size
    /// still matches, otherwise create a new one.
    pub fn upload(&self, slot: &mut Option<LayerTexture>, width: u32, height: u32, data: &[u8]) {
        match slot {
            Some(tex) if tex.matches_size(width, height) => tex.upload_full(&self.ctx.queue, data),
            _ => {
                *slot = Some(LayerTexture::new(
                    &self.ctx.device,
                    &self.ctx.queue,
                    &self.pipelines.texture_layout,
                    &self.pipelines.sampler_nearest,
                    width,
                    height,
                    data,
                ));
            }
        }
    }

    /// Clear the target to transparent and draw `passes` in order.
    pub fn render(&mut self, width: u32, height: u32, passes: &[GpuPass<'_>]) {
        self.ensure_target(width, height);
        let Some((target, _, _)) = &self.target else {
            return;
        };
        let device = &self.ctx.device;
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        // Uniform bind groups must outlive the render pass, so build them first.
        let uniform_groups: Vec<wgpu::BindGroup> = passes
            .iter()
            .map(|pass| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("pass_uniforms"),
                    contents: bytemuck::bytes_of(&pass.uniforms),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("pass_uniform_bg"),
                    layout: &self.pipelines.uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (pass, uniforms) in passes.iter().zip(&uniform_groups) {
                if pass.kind.needs_texture() && pass.texture.is_none() {
                    continue;
                }
                rpass.set_pipeline(self.pipelines.get(pass.kind));
                rpass.set_bind_group(0, uniforms, &[]);
                if let Some(tex) = pass.texture {
                    rpass.set_bind_group(1, &tex.bind_group, &[]);
                }
                rpass.draw(0..6, 0..1);
            }
        }
        self.ctx.submit_one(encoder);
    }

    /// Read the target back as straight-alpha RGBA rows with no padding.
    pub fn read_target(&mut self) -> Result<Vec<u8>> {
        let Some((target, width, height)) = &self.target else {
            return Ok(Vec::new());
        };
        let (width, height) = (*width, *height);
        let device = &self.ctx.device;

        let bytes_per_row = aligned_bytes_per_row(width);
        let buffer_size = (bytes_per_row * height) as u64;

        let need_new = !matches!(&self.staging, Some((_, sz)) if *sz >= buffer_size);
        if need_new {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback_staging"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.staging = Some((buffer, buffer_size));
        }
        let Some((staging, _)) = &self.staging else {
            return Err(EditorError::Gpu("staging buffer missing".into()));
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.submit_one(encoder);

        let slice = staging.slice(..buffer_size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log_err!("readback map error: {:?}", e);
                return Err(EditorError::Gpu(format!("readback map failed: {e:?}")));
            }
            Err(e) => {
                log_err!("readback channel error: {:?}", e);
                return Err(EditorError::Gpu(format!("readback channel closed: {e}")));
            }
        }

        let mapped = slice.get_mapped_range();
        let actual_row = (width * 4) as usize;
        let mut result = Vec::with_capacity(actual_row * height as usize);
        for y in 0..height as usize {
            let start = y * bytes_per_row as usize;
            result.extend_from_slice(&mapped[start..start + actual_row]);
        }
        drop(mapped);
        staging.unmap();

        unpremultiply(&mut result);
        Ok(result)
    }

    fn ensure_target(&mut self, width: u32, height: u32) {
        if matches!(&self.target, Some((_, w, h)) if *w == width && *h == height) {
            return;
        }
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Pipelines::TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        self.target = Some((texture, width, height));
    }
}

fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// The target holds premultiplied colour; callers expect straight alpha.
fn unpremultiply(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
    }

    #[test]
    fn unpremultiply_restores_straight_colour() {
        let mut px = [64, 0, 32, 128, 10, 20, 30, 255, 5, 5, 5, 0];
        unpremultiply(&mut px);
        assert_eq!(&px[..4], &[128, 0, 64, 128]);
        assert_eq!(&px[4..8], &[10, 20, 30, 255]);
        assert_eq!(&px[8..], &[5, 5, 5, 0]);
    }
}
