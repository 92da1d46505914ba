pub mod buffer_pair;
pub mod compute_stage;
pub mod pipeline;
pub mod render_stage;
pub mod scheduler;
