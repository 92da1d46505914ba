use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::simulation::entity::Entity;
use crate::simulation::params::SimulationParams;
use crate::simulation::presets::PresetKind;

/// Everything needed to build a simulation. Missing keys in a config file
/// fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub preset: PresetKind,
    pub entity_count: usize,
    pub seed: u64,
    pub params: SimulationParams,
    pub render_scale: [f32; 2],
    pub window_size: [u32; 2],
    pub vsync: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            preset: PresetKind::default(),
            entity_count: 2000,
            seed: 42,
            params: SimulationParams::default(),
            render_scale: [1.0, 1.0],
            window_size: [1280, 720],
            vsync: true,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded configuration from {path:?}");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.params.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "params must be finite, got {:?}",
                self.params
            )));
        }
        if self.entity_count == 0 {
            return Err(ConfigError::Invalid("entity_count must be at least 1".into()));
        }
        if self.window_size.contains(&0) {
            return Err(ConfigError::Invalid(format!(
                "window_size must be non-zero, got {:?}",
                self.window_size
            )));
        }
        if !self.render_scale.iter().all(|s| s.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "render_scale must be finite, got {:?}",
                self.render_scale
            )));
        }
        Ok(())
    }

    /// Initial entities for `preset`, reproducible from `seed`.
    pub fn entities(&self, preset: PresetKind) -> Vec<Entity> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        preset
            .preset()
            .entities(self.entity_count, self.params.gravitational_constant, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(SimulationConfig::from_json("{}").unwrap(), SimulationConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = SimulationConfig::from_json(
            r#"{ "preset": "cloud", "entity_count": 64, "params": { "delta_t": 0.01 } }"#,
        )
        .unwrap();
        assert_eq!(config.preset, PresetKind::Cloud);
        assert_eq!(config.entity_count, 64);
        assert_eq!(config.params.delta_t, 0.01);
        assert_eq!(
            config.params.gravitational_constant,
            SimulationParams::default().gravitational_constant
        );
        assert!(config.vsync);
    }

    #[test]
    fn rejects_zero_entities_and_zero_window() {
        let err = SimulationConfig::from_json(r#"{ "entity_count": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = SimulationConfig::from_json(r#"{ "window_size": [0, 600] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SimulationConfig::from_json(r#"{ "preset": "spiral" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::load("/nonexistent/gravity.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn entities_are_seeded() {
        let config = SimulationConfig {
            entity_count: 32,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.entities(PresetKind::Cloud),
            config.entities(PresetKind::Cloud)
        );
        assert_eq!(config.entities(PresetKind::Cloud).len(), 32);
    }

    #[test]
    fn triangle_is_drawn_inside_the_view() {
        let config = SimulationConfig::default();
        let [sx, sy] = config.render_scale;
        for entity in config.entities(PresetKind::Triangle) {
            let (x, y) = (entity.pos.x * sx, entity.pos.y * sy);
            assert!(x > -1.0 && x < 1.0, "x = {x}");
            assert!(y > -1.0 && y < 1.0, "y = {y}");
        }
    }
}
