use std::rc::Rc;

use wgpu::util::DeviceExt;

use crate::coords::Point;
use crate::scanout::{Compositor, FramebufferBinding};

use super::common::{CompositeUniform, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::textures::SCANOUT_FORMAT;
use super::WgpuGpu;

/// Textured-quad compositor.
///
/// Two pipelines share one shader: `blit` replaces the destination, `blend`
/// draws with straight alpha (`src * a + dst * (1 - a)`).
pub struct WgpuCompositor {
    gpu: Rc<WgpuGpu>,

    blit_pipeline: wgpu::RenderPipeline,
    blend_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform: wgpu::Buffer,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
}

impl WgpuCompositor {
    pub fn new(gpu: Rc<WgpuGpu>) -> Self {
        let device = &gpu.ctx().device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scanout composite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scanout composite bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CompositeUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scanout composite pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let blit_pipeline =
            create_pipeline(device, &pipeline_layout, &shader, "scanout blit pipeline", None);
        let blend_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            "scanout blend pipeline",
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        // Scanout is pixel exact; never filter.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scanout composite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scanout composite ubo"),
            size: std::mem::size_of::<CompositeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scanout quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scanout quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            gpu,
            blit_pipeline,
            blend_pipeline,
            bind_group_layout,
            sampler,
            uniform,
            quad_vbo,
            quad_ibo,
        }
    }

    /// Draws `src` into `dst` at the placement described by `quad`.
    fn draw(
        &self,
        pipeline: &wgpu::RenderPipeline,
        dst: &FramebufferBinding,
        src: &FramebufferBinding,
        quad: CompositeUniform,
    ) {
        let (Some(dst_id), Some(src_id)) = (dst.texture(), src.texture()) else {
            return;
        };
        let (Some(dst_tex), Some(src_tex)) =
            (self.gpu.texture(dst_id.id()), self.gpu.texture(src_id.id()))
        else {
            log::warn!("composite skipped: texture {dst_id:?} or {src_id:?} not registered");
            return;
        };
        if dst_tex.format() != SCANOUT_FORMAT {
            log::warn!("composite target {dst_id:?} has format {:?}", dst_tex.format());
            return;
        }

        let ctx = self.gpu.ctx();
        ctx.queue
            .write_buffer(&self.uniform, 0, bytemuck::bytes_of(&quad));

        let src_view = src_tex.create_view(&wgpu::TextureViewDescriptor::default());
        let dst_view = dst_tex.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scanout composite bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scanout composite encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scanout composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
            rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..6, 0, 0..1);
        }

        // One submission per draw: the uniform write lands before it.
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl Compositor for WgpuCompositor {
    fn texture_blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool) {
        let target = dst.size();
        let quad = CompositeUniform::new(0, 0, target, target, flip_y);
        self.draw(&self.blit_pipeline, dst, src, quad);
    }

    fn texture_blend(
        &self,
        dst: &FramebufferBinding,
        src: &FramebufferBinding,
        flip_y: bool,
        pos: Point,
    ) {
        let quad = CompositeUniform::new(pos.x, pos.y, src.size(), dst.size(), flip_y);
        self.draw(&self.blend_pipeline, dst, src, quad);
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: SCANOUT_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
