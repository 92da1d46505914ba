use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::GpuError;
use crate::gpu::backend::{BufferUsage, GpuBackend};

// Uniform record consumed by the compute program at binding 0
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub delta_t: f32,
    pub gravitational_constant: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            delta_t: 0.005,
            gravitational_constant: 1.0e-4,
        }
    }
}

impl SimulationParams {
    pub fn is_finite(&self) -> bool {
        self.delta_t.is_finite() && self.gravitational_constant.is_finite()
    }
}

/// Owns the uniform buffer behind [`SimulationParams`]. The latest update wins
/// and is seen by the next dispatch that has not been submitted yet.
pub struct SimulationParamsStore<B: GpuBackend> {
    params: SimulationParams,
    buffer: B::Buffer,
}

impl<B: GpuBackend> SimulationParamsStore<B> {
    pub fn new(backend: &B, params: SimulationParams) -> Result<Self, GpuError> {
        let buffer = backend.create_buffer(
            "Simulation Params Buffer",
            bytemuck::bytes_of(&params),
            BufferUsage::Uniform,
        )?;
        Ok(Self { params, buffer })
    }

    pub fn update(&mut self, backend: &B, params: SimulationParams) {
        log::debug!(
            "Simulation params: delta_t={} G={}",
            params.delta_t,
            params.gravitational_constant
        );
        backend.write_buffer(&self.buffer, bytemuck::bytes_of(&params));
        self.params = params;
    }

    pub fn params(&self) -> SimulationParams {
        self.params
    }

    pub fn buffer(&self) -> &B::Buffer {
        &self.buffer
    }
}
