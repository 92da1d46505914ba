//! The narrow set of device capabilities the pipeline is written against.
//!
//! Everything that decides *which* buffer is read or written lives above this
//! trait, so it can be exercised against an in-memory backend as well as wgpu.

use crate::error::GpuError;

/// How a buffer is going to be bound.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    /// Kinematic state: instance vertex input and compute storage.
    Kinematic,
    /// Static per-vertex or per-instance render input.
    Vertex,
    /// Small uniform record rewritten between frames.
    Uniform,
}

/// The three buffers one binding set presents to the compute program.
pub struct EntityBindings<'a, Buf> {
    /// Binding 0, uniform.
    pub params: &'a Buf,
    /// Binding 1, read-only storage.
    pub previous: &'a Buf,
    /// Binding 2, read-write storage.
    pub next: &'a Buf,
    /// Byte length bound for both kinematic buffers.
    pub kinematic_len: u64,
}

pub struct ComputeCommand<'a, B: GpuBackend> {
    pub pipeline: &'a B::ComputePipeline,
    pub bind_group: &'a B::BindGroup,
    pub workgroups: u32,
}

/// One instanced draw. Vertex buffers are bound in slot order 0..=3.
pub struct DrawCommand<'a, B: GpuBackend> {
    pub pipeline: &'a B::RenderPipeline,
    pub scale: &'a B::Buffer,
    pub kinematics: &'a B::Buffer,
    pub colours: &'a B::Buffer,
    pub geometry: &'a B::Buffer,
    pub vertex_count: u32,
    pub instance_count: u32,
}

/// All work recorded for one tick. Backends encode the compute pass before
/// the render pass and submit both as a single unit.
pub struct FrameCommands<'a, B: GpuBackend> {
    pub target: B::Target,
    pub compute: ComputeCommand<'a, B>,
    pub draw: DrawCommand<'a, B>,
}

pub trait GpuBackend: Sized {
    type Buffer;
    type BindGroup;
    type ComputePipeline;
    type RenderPipeline;
    type Target;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, GpuError>;

    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    /// Overwrites the start of `buffer`; visible to every later submission.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    fn read_buffer(&self, buffer: &Self::Buffer) -> Result<Vec<u8>, GpuError>;

    fn create_compute_pipeline(&self) -> Result<Self::ComputePipeline, GpuError>;

    fn create_render_pipeline(&self) -> Result<Self::RenderPipeline, GpuError>;

    fn create_bind_group(
        &self,
        label: &str,
        pipeline: &Self::ComputePipeline,
        bindings: EntityBindings<'_, Self::Buffer>,
    ) -> Result<Self::BindGroup, GpuError>;

    /// Width over height of whatever is being presented to.
    /// Largest workgroup count one dispatch dimension accepts.
    fn max_workgroups(&self) -> u32;

    fn aspect_ratio(&self) -> f32;

    fn acquire_target(&mut self) -> Result<Self::Target, GpuError>;

    fn submit(&mut self, frame: FrameCommands<'_, Self>) -> Result<(), GpuError>;
}
