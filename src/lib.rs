//! GPU gravity simulation drawn as instanced sprites.
//!
//! Entity state lives in a pair of device buffers. Every tick a compute pass
//! integrates one buffer into the other and a render pass draws the result;
//! the roles swap on the next tick.

pub mod app;
pub mod config;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod rendering;
pub mod simulation;

pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use rendering::pipeline::GravityPipeline;
pub use simulation::entity::{Colour, Entity};
pub use simulation::params::SimulationParams;
