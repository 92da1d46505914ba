//! In-memory backend for tests. Buffers are byte vectors and the compute
//! command runs a CPU version of the integration step, so the pipeline's
//! buffer discipline can be checked without a device.

use std::cell::{Cell, RefCell};

use crate::error::GpuError;
use crate::gpu::backend::{BufferUsage, EntityBindings, FrameCommands, GpuBackend};
use crate::simulation::params::SimulationParams;
use crate::simulation::types::{COMPUTE_WORKGROUP_SIZE, KinematicRecord};

const SOFTENING: f32 = 1.0e-4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FakeBuffer(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FakeBindGroup {
    pub params: FakeBuffer,
    pub previous: FakeBuffer,
    pub next: FakeBuffer,
}

pub(crate) struct FakeComputePipeline;

pub(crate) struct FakeRenderPipeline;

/// What one `submit` call asked for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmittedFrame {
    pub target: u64,
    pub compute_reads: FakeBuffer,
    pub compute_writes: FakeBuffer,
    pub workgroups: u32,
    pub draw_reads: FakeBuffer,
    pub vertex_count: u32,
    pub instance_count: u32,
}

struct StoredBuffer {
    label: String,
    usage: BufferUsage,
    bytes: Vec<u8>,
}

pub(crate) struct FakeBackend {
    buffers: RefCell<Vec<StoredBuffer>>,
    allocation_limit: Cell<Option<usize>>,
    submissions: Vec<SubmittedFrame>,
    targets_acquired: u64,
    lost: Option<String>,
    aspect_ratio: f32,
    max_workgroups: u32,
    rejected_submit: Option<String>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            buffers: RefCell::new(Vec::new()),
            allocation_limit: Cell::new(None),
            submissions: Vec::new(),
            targets_acquired: 0,
            lost: None,
            aspect_ratio: 1.0,
            max_workgroups: 65_535,
            rejected_submit: None,
        }
    }

    pub(crate) fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub(crate) fn with_max_workgroups(mut self, max_workgroups: u32) -> Self {
        self.max_workgroups = max_workgroups;
        self
    }

    /// Buffer creation fails once `count` buffers exist.
    pub(crate) fn fail_allocations_after(&self, count: usize) {
        self.allocation_limit.set(Some(count));
    }

    /// The next `submit` fails the way a validation error would.
    pub(crate) fn reject_next_submit(&mut self, message: &str) {
        self.rejected_submit = Some(message.to_owned());
    }

    pub(crate) fn lose_device(&mut self, reason: &str) {
        self.lost = Some(reason.to_owned());
    }

    pub(crate) fn submissions(&self) -> &[SubmittedFrame] {
        &self.submissions
    }

    pub(crate) fn targets_acquired(&self) -> u64 {
        self.targets_acquired
    }

    pub(crate) fn bytes(&self, buffer: &FakeBuffer) -> Vec<u8> {
        self.buffers.borrow()[buffer.0].bytes.clone()
    }

    pub(crate) fn read_floats(&self, buffer: &FakeBuffer) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.bytes(buffer))
    }

    pub(crate) fn usage(&self, buffer: &FakeBuffer) -> BufferUsage {
        self.buffers.borrow()[buffer.0].usage
    }

    pub(crate) fn label(&self, buffer: &FakeBuffer) -> String {
        self.buffers.borrow()[buffer.0].label.clone()
    }

    fn check_device(&self) -> Result<(), GpuError> {
        match &self.lost {
            Some(reason) => Err(GpuError::DeviceLost(reason.clone())),
            None => Ok(()),
        }
    }

    fn run_compute(&self, bind_group: &FakeBindGroup, workgroups: u32) {
        let params: SimulationParams =
            bytemuck::pod_read_unaligned(&self.bytes(&bind_group.params));
        let previous: Vec<KinematicRecord> =
            bytemuck::pod_collect_to_vec(&self.bytes(&bind_group.previous));
        let mut next: Vec<KinematicRecord> =
            bytemuck::pod_collect_to_vec(&self.bytes(&bind_group.next));

        let invocations = (workgroups * COMPUTE_WORKGROUP_SIZE) as usize;
        for index in 0..invocations.min(previous.len()) {
            next[index] = reference_step(&previous, index, params);
        }

        self.buffers.borrow_mut()[bind_group.next.0].bytes = bytemuck::cast_slice(&next).to_vec();
    }
}

/// CPU version of one invocation of the update shader.
pub(crate) fn reference_step(
    entities: &[KinematicRecord],
    index: usize,
    params: SimulationParams,
) -> KinematicRecord {
    let mut entity = entities[index];
    let mut acceleration = [0.0f32; 2];

    for (other_index, other) in entities.iter().enumerate() {
        if other_index == index {
            continue;
        }
        let dx = other.position[0] - entity.position[0];
        let dy = other.position[1] - entity.position[1];
        let dist_sq = dx * dx + dy * dy + SOFTENING;
        let factor = other.mass / (dist_sq * dist_sq.sqrt());
        acceleration[0] += dx * factor;
        acceleration[1] += dy * factor;
    }

    for axis in 0..2 {
        entity.velocity[axis] +=
            acceleration[axis] * params.gravitational_constant * params.delta_t;
        entity.position[axis] += entity.velocity[axis] * params.delta_t;
    }
    entity
}

impl GpuBackend for FakeBackend {
    type Buffer = FakeBuffer;
    type BindGroup = FakeBindGroup;
    type ComputePipeline = FakeComputePipeline;
    type RenderPipeline = FakeRenderPipeline;
    type Target = u64;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<FakeBuffer, GpuError> {
        self.check_device()?;
        let mut buffers = self.buffers.borrow_mut();
        if self
            .allocation_limit
            .get()
            .is_some_and(|limit| buffers.len() >= limit)
        {
            return Err(GpuError::Allocation {
                label: label.to_owned(),
                message: "out of memory".to_owned(),
            });
        }
        buffers.push(StoredBuffer {
            label: label.to_owned(),
            usage,
            bytes: contents.to_vec(),
        });
        Ok(FakeBuffer(buffers.len() - 1))
    }

    fn buffer_size(&self, buffer: &FakeBuffer) -> u64 {
        self.buffers.borrow()[buffer.0].bytes.len() as u64
    }

    fn write_buffer(&self, buffer: &FakeBuffer, data: &[u8]) {
        let mut buffers = self.buffers.borrow_mut();
        let stored = &mut buffers[buffer.0];
        assert!(data.len() <= stored.bytes.len(), "write past end of {}", stored.label);
        stored.bytes[..data.len()].copy_from_slice(data);
    }

    fn read_buffer(&self, buffer: &FakeBuffer) -> Result<Vec<u8>, GpuError> {
        self.check_device()?;
        Ok(self.bytes(buffer))
    }

    fn create_compute_pipeline(&self) -> Result<FakeComputePipeline, GpuError> {
        self.check_device()?;
        Ok(FakeComputePipeline)
    }

    fn create_render_pipeline(&self) -> Result<FakeRenderPipeline, GpuError> {
        self.check_device()?;
        Ok(FakeRenderPipeline)
    }

    fn create_bind_group(
        &self,
        _label: &str,
        _pipeline: &FakeComputePipeline,
        bindings: EntityBindings<'_, FakeBuffer>,
    ) -> Result<FakeBindGroup, GpuError> {
        self.check_device()?;
        Ok(FakeBindGroup {
            params: *bindings.params,
            previous: *bindings.previous,
            next: *bindings.next,
        })
    }

    fn max_workgroups(&self) -> u32 {
        self.max_workgroups
    }

    fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    fn acquire_target(&mut self) -> Result<u64, GpuError> {
        self.check_device()?;
        self.targets_acquired += 1;
        Ok(self.targets_acquired)
    }

    fn submit(&mut self, frame: FrameCommands<'_, Self>) -> Result<(), GpuError> {
        self.check_device()?;
        if let Some(message) = self.rejected_submit.take() {
            return Err(GpuError::Submission(message));
        }

        // Same order the real backend encodes: compute, then render.
        self.run_compute(frame.compute.bind_group, frame.compute.workgroups);

        self.submissions.push(SubmittedFrame {
            target: frame.target,
            compute_reads: frame.compute.bind_group.previous,
            compute_writes: frame.compute.bind_group.next,
            workgroups: frame.compute.workgroups,
            draw_reads: *frame.draw.kinematics,
            vertex_count: frame.draw.vertex_count,
            instance_count: frame.draw.instance_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: f32, y: f32, mass: f32) -> KinematicRecord {
        KinematicRecord {
            position: [x, y],
            velocity: [0.0, 0.0],
            mass,
            _pad: 0.0,
        }
    }

    #[test]
    fn reference_step_pulls_bodies_together() {
        let entities = [record(-1.0, 0.0, 1.0), record(1.0, 0.0, 1.0)];
        let params = SimulationParams {
            delta_t: 0.1,
            gravitational_constant: 1.0,
        };

        let left = reference_step(&entities, 0, params);
        let right = reference_step(&entities, 1, params);

        assert!(left.velocity[0] > 0.0);
        assert!(right.velocity[0] < 0.0);
        assert_eq!(left.velocity[1], 0.0);
        assert!((left.velocity[0] + right.velocity[0]).abs() < 1e-6);
    }

    #[test]
    fn zero_time_step_changes_nothing() {
        let entities = [record(-1.0, 0.5, 2.0), record(1.0, 0.0, 1.0)];
        let params = SimulationParams {
            delta_t: 0.0,
            gravitational_constant: 10.0,
        };
        assert_eq!(reference_step(&entities, 0, params), entities[0]);
    }

    #[test]
    fn allocation_limit_fails_creation() {
        let backend = FakeBackend::new();
        backend.fail_allocations_after(1);
        backend
            .create_buffer("first", &[0; 8], BufferUsage::Uniform)
            .unwrap();
        let err = backend
            .create_buffer("second", &[0; 8], BufferUsage::Uniform)
            .unwrap_err();
        assert!(matches!(err, GpuError::Allocation { label, .. } if label == "second"));
    }
}
