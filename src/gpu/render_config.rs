use crate::simulation::types::{COLOUR_STRIDE, KINEMATIC_STRIDE};

const SCALE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
// Only the position of each kinematic record is read; velocity, mass and padding are skipped by the stride
const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const COLOUR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];
const GEOMETRY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x2];

const GEOMETRY_STRIDE: wgpu::BufferAddress = 2 * std::mem::size_of::<f32>() as wgpu::BufferAddress;

// Shaders, bind group layout and pipeline descriptors for the two programs
pub(crate) struct RenderConfig {
    pub(crate) surface_format: wgpu::TextureFormat,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    update_shader: wgpu::ShaderModule,
    sprite_shader: wgpu::ShaderModule,
}

impl RenderConfig {
    pub(crate) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let update_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Update Entities Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/update_entities.wgsl").into()),
        });
        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sprite.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Entity Bind Group Layout"),
            entries: &[
                // simulation params
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(8),
                    },
                    count: None,
                },
                // entities_in
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(KINEMATIC_STRIDE),
                    },
                    count: None,
                },
                // entities_out
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(KINEMATIC_STRIDE),
                    },
                    count: None,
                },
            ],
        });

        Self {
            surface_format,
            bind_group_layout,
            update_shader,
            sprite_shader,
        }
    }

    pub(crate) fn create_compute_pipeline(&self, device: &wgpu::Device) -> wgpu::ComputePipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Update Entities Pipeline Layout"),
            bind_group_layouts: &[&self.bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Update Entities Pipeline"),
            layout: Some(&pipeline_layout),
            module: &self.update_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    pub(crate) fn create_render_pipeline(&self, device: &wgpu::Device) -> wgpu::RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.sprite_shader,
                entry_point: Some("vert_main"),
                buffers: &sprite_vertex_layouts(),
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.sprite_shader,
                entry_point: Some("frag_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
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
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

/// Vertex inputs in slot order: scale, entity position, colour, sprite geometry.
fn sprite_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 4] {
    [
        // A stride of zero gives every instance the same scale
        wgpu::VertexBufferLayout {
            array_stride: 0,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &SCALE_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: KINEMATIC_STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &POSITION_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: COLOUR_STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &COLOUR_ATTRIBUTES,
        },
        wgpu::VertexBufferLayout {
            array_stride: GEOMETRY_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &GEOMETRY_ATTRIBUTES,
        },
    ]
}

/// Clears the target and begins the pass the sprites are drawn in.
pub(crate) fn begin_sprite_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    texture_view: &'a wgpu::TextureView,
    color: wgpu::Color,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Sprite Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: texture_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_the_packed_records() {
        let layouts = sprite_vertex_layouts();
        let locations: Vec<u32> = layouts
            .iter()
            .flat_map(|layout| layout.attributes.iter().map(|a| a.shader_location))
            .collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);

        assert_eq!(layouts[0].array_stride, 0);
        assert_eq!(layouts[1].array_stride, 24);
        assert_eq!(layouts[1].attributes[0].offset, 0);
        assert_eq!(layouts[1].attributes[0].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(layouts[2].array_stride, 12);
        assert_eq!(layouts[2].attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(layouts[3].step_mode, wgpu::VertexStepMode::Vertex);
        assert!(layouts[..3].iter().all(|l| l.step_mode == wgpu::VertexStepMode::Instance));
    }
}
