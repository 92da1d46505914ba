use crate::error::GpuError;
use crate::gpu::backend::{BufferUsage, EntityBindings, GpuBackend};
use crate::simulation::types::KINEMATIC_STRIDE;

/// Two equally sized kinematic buffers and the two binding sets that
/// alternate between them. Binding set `i` reads buffer `i` and writes
/// buffer `(i + 1) % 2`; only the selection changes from tick to tick.
///
/// Changing the entity count means building a new pair.
pub struct BufferPair<B: GpuBackend> {
    buffers: [B::Buffer; 2], // Ping-pong buffers
    bind_groups: [B::BindGroup; 2],
    byte_len: u64,
}

impl<B: GpuBackend> BufferPair<B> {
    /// Uploads `initial` into both buffers so either one is a valid read
    /// before the first compute pass has run.
    pub fn new(
        backend: &B,
        pipeline: &B::ComputePipeline,
        params: &B::Buffer,
        initial: &[u8],
    ) -> Result<Self, GpuError> {
        let byte_len = initial.len() as u64;
        if byte_len == 0 || byte_len % KINEMATIC_STRIDE != 0 {
            return Err(GpuError::InvalidKinematicLength { len: byte_len });
        }

        let buffers = [
            backend.create_buffer("Kinematic Buffer 0", initial, BufferUsage::Kinematic)?,
            backend.create_buffer("Kinematic Buffer 1", initial, BufferUsage::Kinematic)?,
        ];

        let bind_groups = [
            create_binding_set(
                backend,
                "Entity Bind Group 0",
                pipeline,
                params,
                &buffers[0],
                &buffers[1],
                byte_len,
            )?,
            create_binding_set(
                backend,
                "Entity Bind Group 1",
                pipeline,
                params,
                &buffers[1],
                &buffers[0],
                byte_len,
            )?,
        ];

        log::debug!(
            "Allocated kinematic buffer pair: 2 x {byte_len} bytes ({} entities)",
            byte_len / KINEMATIC_STRIDE
        );

        Ok(Self {
            buffers,
            bind_groups,
            byte_len,
        })
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn entity_count(&self) -> u32 {
        (self.byte_len / KINEMATIC_STRIDE) as u32
    }

    /// Binding set used by the compute pass of tick `t`.
    pub fn binding_set(&self, t: u64) -> &B::BindGroup {
        &self.bind_groups[parity(t)]
    }

    /// Buffer the compute pass of tick `t` reads: the last completed state.
    pub fn source(&self, t: u64) -> &B::Buffer {
        &self.buffers[parity(t)]
    }

    /// Buffer the compute pass of tick `t` writes and the render pass reads.
    pub fn destination(&self, t: u64) -> &B::Buffer {
        &self.buffers[parity(t.wrapping_add(1))]
    }

    pub fn buffers(&self) -> &[B::Buffer; 2] {
        &self.buffers
    }
}

fn parity(t: u64) -> usize {
    (t % 2) as usize
}

/// Builds one binding set, refusing buffers whose length differs from the
/// pair's so nothing is silently truncated or padded.
pub fn create_binding_set<B: GpuBackend>(
    backend: &B,
    label: &str,
    pipeline: &B::ComputePipeline,
    params: &B::Buffer,
    previous: &B::Buffer,
    next: &B::Buffer,
    kinematic_len: u64,
) -> Result<B::BindGroup, GpuError> {
    for (binding, buffer) in [(1, previous), (2, next)] {
        let actual = backend.buffer_size(buffer);
        if actual != kinematic_len {
            return Err(GpuError::BindingLengthMismatch {
                binding,
                expected: kinematic_len,
                actual,
            });
        }
    }

    backend.create_bind_group(
        label,
        pipeline,
        EntityBindings {
            params,
            previous,
            next,
            kinematic_len,
        },
    )
}
