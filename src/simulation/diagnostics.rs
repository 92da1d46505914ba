//! Conserved quantities of a host-side entity snapshot.

use std::fmt;

use glam::Vec2;

use crate::simulation::entity::Entity;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SystemSummary {
    pub entity_count: usize,
    pub total_mass: f32,
    pub centre_of_mass: Vec2,
    pub momentum: Vec2,
    pub kinetic_energy: f32,
}

impl SystemSummary {
    /// Sums are accumulated in f64 so large snapshots don't drift.
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut total_mass = 0.0f64;
        let mut weighted_x = 0.0f64;
        let mut weighted_y = 0.0f64;
        let mut momentum_x = 0.0f64;
        let mut momentum_y = 0.0f64;
        let mut kinetic_energy = 0.0f64;

        for entity in entities {
            let m = entity.mass as f64;
            total_mass += m;
            weighted_x += m * entity.pos.x as f64;
            weighted_y += m * entity.pos.y as f64;
            momentum_x += m * entity.vel.x as f64;
            momentum_y += m * entity.vel.y as f64;
            kinetic_energy += 0.5 * m * entity.vel.length_squared() as f64;
        }

        let centre_of_mass = if total_mass != 0.0 {
            Vec2::new((weighted_x / total_mass) as f32, (weighted_y / total_mass) as f32)
        } else {
            Vec2::ZERO
        };

        Self {
            entity_count: entities.len(),
            total_mass: total_mass as f32,
            centre_of_mass,
            momentum: Vec2::new(momentum_x as f32, momentum_y as f32),
            kinetic_energy: kinetic_energy as f32,
        }
    }
}

impl fmt::Display for SystemSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entities={} mass={:.3} com=({:.4}, {:.4}) p=({:.5}, {:.5}) ke={:.6}",
            self.entity_count,
            self.total_mass,
            self.centre_of_mass.x,
            self.centre_of_mass.y,
            self.momentum.x,
            self.momentum.y,
            self.kinetic_energy
        )
    }
}
