pub mod diagnostics;
pub mod entity;
pub mod params;
pub mod presets;
pub mod types;
