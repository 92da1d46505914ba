//! Offscreen batch runner: ticks a fixed number of frames without a window
//! and reads the final state back.

use std::time::Instant;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::gpu::backend::GpuBackend;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::rendering::pipeline::GravityPipeline;
use crate::simulation::diagnostics::SystemSummary;
use crate::simulation::entity::Entity;

#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub frames: u32,
    pub progress_interval: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 1000,
            progress_interval: 250,
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug)]
pub struct HeadlessReport {
    pub frames: u32,
    pub entities: Vec<Entity>,
    pub initial: SystemSummary,
    pub summary: SystemSummary,
}

pub fn run_headless(simulation: &SimulationConfig, config: &HeadlessConfig) -> Result<HeadlessReport> {
    simulation.validate()?;
    let backend = pollster::block_on(WgpuBackend::headless(config.width, config.height))?;
    let entities = simulation.entities(simulation.preset);
    let mut pipeline = GravityPipeline::new(backend, &entities, simulation.params, simulation.render_scale)?;
    run_frames(&mut pipeline, config)
}

/// Starts `pipeline` and runs `config.frames` ticks on it.
pub fn run_frames<B: GpuBackend>(
    pipeline: &mut GravityPipeline<B>,
    config: &HeadlessConfig,
) -> Result<HeadlessReport> {
    let initial = SystemSummary::from_entities(&pipeline.read_entities()?);
    log::info!(
        "Headless run started: {} frames, {} entities",
        config.frames,
        pipeline.entity_count()
    );

    pipeline.start();
    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_report_frame = 0u32;

    for step in 0..config.frames {
        pipeline.tick()?;

        if config.progress_interval > 0 && (step + 1) % config.progress_interval == 0 {
            let done = step + 1;
            let total_fps = done as f64 / started.elapsed().as_secs_f64().max(1e-6);
            let window_fps =
                (done - last_report_frame) as f64 / last_report.elapsed().as_secs_f64().max(1e-6);

            log::info!(
                "Headless progress: {}/{} | fps={:.0} (window {:.0})",
                done,
                config.frames,
                total_fps,
                window_fps,
            );

            last_report = Instant::now();
            last_report_frame = done;
        }
    }

    let entities = pipeline.read_entities()?;
    let summary = SystemSummary::from_entities(&entities);
    log::info!(
        "Headless run finished in {:.2}s: {}",
        started.elapsed().as_secs_f64(),
        summary
    );

    Ok(HeadlessReport {
        frames: config.frames,
        entities,
        initial,
        summary,
    })
}
