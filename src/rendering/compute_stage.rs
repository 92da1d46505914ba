use crate::error::GpuError;
use crate::gpu::backend::{ComputeCommand, GpuBackend};
use crate::rendering::buffer_pair::BufferPair;
use crate::simulation::types::dispatch_workgroups;

/// The physics pass: one dispatch per tick over every entity.
pub struct ComputeStage<B: GpuBackend> {
    pipeline: B::ComputePipeline,
    workgroups: u32,
}

impl<B: GpuBackend> ComputeStage<B> {
    pub fn new(backend: &B, entity_count: u32) -> Result<Self, GpuError> {
        let workgroups = dispatch_workgroups(entity_count);
        let limit = backend.max_workgroups();
        if workgroups > limit {
            return Err(GpuError::Allocation {
                label: "Update Entities Dispatch".to_owned(),
                message: format!(
                    "{entity_count} entities need {workgroups} workgroups, device allows {limit}"
                ),
            });
        }
        Ok(Self {
            pipeline: backend.create_compute_pipeline()?,
            workgroups,
        })
    }

    pub fn pipeline(&self) -> &B::ComputePipeline {
        &self.pipeline
    }

    pub fn workgroups(&self) -> u32 {
        self.workgroups
    }

    /// Reads `buffers.source(t)` and leaves the new state in `buffers.destination(t)`.
    pub fn record<'a>(&'a self, buffers: &'a BufferPair<B>, t: u64) -> ComputeCommand<'a, B> {
        ComputeCommand {
            pipeline: &self.pipeline,
            bind_group: buffers.binding_set(t),
            workgroups: self.workgroups,
        }
    }
}
