use crate::error::GpuError;
use crate::gpu::backend::{BufferUsage, DrawCommand, GpuBackend};
use crate::rendering::buffer_pair::BufferPair;
use crate::simulation::types::COLOUR_FLOATS;

pub const OUTER_VERTEX_COUNT: usize = 16;
pub const SPRITE_RADIUS: f32 = 0.005;

/// Small filled disc drawn for every entity, stored as a triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteGeometry {
    vertices: Vec<[f32; 2]>,
}

impl SpriteGeometry {
    /// A fan of `OUTER_VERTEX_COUNT` outer vertices around the origin.
    /// `aspect_ratio` is width over height; x is squeezed so the disc stays round.
    pub fn fan(radius: f32, aspect_ratio: f32) -> Self {
        let x_scale = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            1.0 / aspect_ratio
        } else {
            1.0
        };
        let increment = std::f32::consts::TAU / OUTER_VERTEX_COUNT as f32;

        let mut vertices = Vec::with_capacity(OUTER_VERTEX_COUNT * 3);
        for i in 0..OUTER_VERTEX_COUNT {
            let a = i as f32 * increment;
            let b = a + increment;
            vertices.push([0.0, 0.0]);
            vertices.push([a.cos() * radius * x_scale, a.sin() * radius]);
            vertices.push([b.cos() * radius * x_scale, b.sin() * radius]);
        }

        Self { vertices }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Sprite pass: one instanced draw reading the state the compute pass of the
/// same tick has just written.
pub struct RenderStage<B: GpuBackend> {
    pipeline: B::RenderPipeline,
    scale_buffer: B::Buffer,
    colour_buffer: B::Buffer,
    geometry_buffer: B::Buffer,
    geometry: SpriteGeometry,
    instance_count: u32,
}

impl<B: GpuBackend> RenderStage<B> {
    pub fn new(backend: &B, colours: &[f32], scale: [f32; 2]) -> Result<Self, GpuError> {
        let geometry = SpriteGeometry::fan(SPRITE_RADIUS, backend.aspect_ratio());

        let pipeline = backend.create_render_pipeline()?;
        let scale_buffer =
            backend.create_buffer("Render Scale Buffer", bytemuck::cast_slice(&scale), BufferUsage::Vertex)?;
        let colour_buffer =
            backend.create_buffer("Sprite Colour Buffer", bytemuck::cast_slice(colours), BufferUsage::Vertex)?;
        let geometry_buffer =
            backend.create_buffer("Sprite Vertex Buffer", geometry.as_bytes(), BufferUsage::Vertex)?;

        Ok(Self {
            pipeline,
            scale_buffer,
            colour_buffer,
            geometry_buffer,
            geometry,
            instance_count: (colours.len() / COLOUR_FLOATS) as u32,
        })
    }

    pub fn geometry(&self) -> &SpriteGeometry {
        &self.geometry
    }

    pub fn colour_buffer(&self) -> &B::Buffer {
        &self.colour_buffer
    }

    /// Draws from `buffers.destination(t)`, never from the stale source buffer.
    pub fn record<'a>(&'a self, buffers: &'a BufferPair<B>, t: u64) -> DrawCommand<'a, B> {
        DrawCommand {
            pipeline: &self.pipeline,
            scale: &self.scale_buffer,
            kinematics: buffers.destination(t),
            colours: &self.colour_buffer,
            geometry: &self.geometry_buffer,
            vertex_count: self.geometry.vertex_count(),
            instance_count: self.instance_count,
        }
    }
}
