use crate::error::{ConfigError, EncodeError, Error, Result};
use crate::gpu::backend::{FrameCommands, GpuBackend};
use crate::rendering::buffer_pair::BufferPair;
use crate::rendering::compute_stage::ComputeStage;
use crate::rendering::render_stage::RenderStage;
use crate::rendering::scheduler::FrameScheduler;
use crate::simulation::entity::{Entity, decode_entities, encode_entities};
use crate::simulation::params::{SimulationParams, SimulationParamsStore};

/// Owns every GPU resource of one simulation session. The entity count is
/// fixed here; a different count needs a new pipeline.
pub struct GravityPipeline<B: GpuBackend> {
    backend: B,
    params: SimulationParamsStore<B>,
    compute: ComputeStage<B>,
    buffers: BufferPair<B>,
    render: RenderStage<B>,
    scheduler: FrameScheduler,
}

impl<B: GpuBackend> GravityPipeline<B> {
    pub fn new(
        backend: B,
        entities: &[Entity],
        params: SimulationParams,
        render_scale: [f32; 2],
    ) -> Result<Self> {
        if entities.is_empty() {
            return Err(EncodeError::Empty.into());
        }
        check_params(&params)?;
        let encoded = encode_entities(entities)?;
        let entity_count = encoded.entity_count() as u32;

        let params = SimulationParamsStore::new(&backend, params)?;
        let compute = ComputeStage::new(&backend, entity_count)?;
        let buffers = BufferPair::new(
            &backend,
            compute.pipeline(),
            params.buffer(),
            encoded.kinematic_bytes(),
        )?;
        let render = RenderStage::new(&backend, encoded.colours(), render_scale)?;

        log::info!(
            "Pipeline ready: {} entities, {} workgroups per tick, {} bytes per kinematic buffer",
            entity_count,
            compute.workgroups(),
            buffers.byte_len()
        );

        Ok(Self {
            backend,
            params,
            compute,
            buffers,
            render,
            scheduler: FrameScheduler::new(),
        })
    }

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// One frame: acquire a target, compute tick `t`, draw the state it
    /// produced, submit both passes together, then move on to `t + 1`.
    ///
    /// On error nothing has been submitted and `t` is unchanged.
    pub fn tick(&mut self) -> Result<()> {
        if !self.scheduler.is_running() {
            return Err(Error::SchedulerIdle);
        }
        let t = self.scheduler.tick();

        let target = self.backend.acquire_target()?;
        let frame = FrameCommands {
            target,
            compute: self.compute.record(&self.buffers, t),
            draw: self.render.record(&self.buffers, t),
        };
        self.backend.submit(frame)?;

        self.scheduler.advance();
        log::trace!("Submitted tick {t}");
        Ok(())
    }

    /// Takes effect from the next tick.
    pub fn update_params(&mut self, params: SimulationParams) -> Result<()> {
        check_params(&params)?;
        self.params.update(&self.backend, params);
        Ok(())
    }

    pub fn params(&self) -> SimulationParams {
        self.params.params()
    }

    pub fn entity_count(&self) -> u32 {
        self.buffers.entity_count()
    }

    pub fn workgroups(&self) -> u32 {
        self.compute.workgroups()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn buffers(&self) -> &BufferPair<B> {
        &self.buffers
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Reads back the last completed state.
    pub fn read_entities(&self) -> Result<Vec<Entity>> {
        let current = self.buffers.source(self.scheduler.tick());
        let kinematics: Vec<f32> = bytemuck::pod_collect_to_vec(&self.backend.read_buffer(current)?);
        let colours: Vec<f32> =
            bytemuck::pod_collect_to_vec(&self.backend.read_buffer(self.render.colour_buffer())?);
        Ok(decode_entities(&kinematics, &colours)?)
    }
}

fn check_params(params: &SimulationParams) -> Result<()> {
    if params.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("non-finite simulation parameters {params:?}")).into())
    }
}
