pub mod backend;
pub(crate) mod render_config;
pub mod wgpu_backend;

#[cfg(test)]
pub(crate) mod fake;
