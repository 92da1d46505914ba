use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::simulation::entity::{Colour, Entity};

/// A named way of filling the simulation with its initial entities.
pub trait Preset {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Initial entities. `count` is a request; a preset with a fixed layout may ignore it.
    fn entities(&self, count: usize, gravitational_constant: f32, rng: &mut StdRng) -> Vec<Entity>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetKind {
    #[default]
    Galaxy,
    Triangle,
    Cloud,
}

impl PresetKind {
    pub const ALL: [PresetKind; 3] = [PresetKind::Galaxy, PresetKind::Triangle, PresetKind::Cloud];

    pub fn preset(self) -> &'static dyn Preset {
        match self {
            PresetKind::Galaxy => &GalaxyPreset,
            PresetKind::Triangle => &TrianglePreset,
            PresetKind::Cloud => &CloudPreset,
        }
    }

    /// The preset after this one, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|kind| *kind == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

pub struct GalaxyPreset;

const CENTRAL_MASS: f32 = 5000.0;

impl Preset for GalaxyPreset {
    fn name(&self) -> &str {
        "Galaxy"
    }

    fn description(&self) -> &str {
        "A heavy central body with a disc of light bodies on circular orbits"
    }

    fn entities(&self, count: usize, gravitational_constant: f32, rng: &mut StdRng) -> Vec<Entity> {
        let mut entities = Vec::with_capacity(count.max(1));

        entities.push(Entity::new(
            Vec2::ZERO,
            Vec2::ZERO,
            CENTRAL_MASS,
            Some(Colour::new(1.0, 0.9, 0.1)),
        ));

        for _ in 1..count {
            // More bodies towards the rim
            let distance = 0.15 + 0.65 * rng.gen_range(0.0f32..1.0).sqrt();
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let direction = Vec2::from_angle(angle);

            let speed = (gravitational_constant * CENTRAL_MASS / distance).sqrt();
            let velocity = direction.perp() * speed;

            let mass = 0.01 + rng.gen_range(0.0..1.0) * 0.2;
            let hue = distance / 0.8;

            entities.push(Entity::new(
                direction * distance,
                velocity,
                mass,
                Some(hsl_to_rgb(hue, 0.8, 0.6)),
            ));
        }

        entities
    }
}

const TRIANGLE_CORNERS: [Vec2; 3] = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
const TRIANGLE_SCALE: f32 = 0.5;

pub struct TrianglePreset;

impl Preset for TrianglePreset {
    fn name(&self) -> &str {
        "Triangle"
    }

    fn description(&self) -> &str {
        "Three unit masses at rest on the corners of a right triangle"
    }

    fn entities(&self, _count: usize, _gravitational_constant: f32, _rng: &mut StdRng) -> Vec<Entity> {
        let centroid = TRIANGLE_CORNERS.iter().copied().sum::<Vec2>() / 3.0;
        TRIANGLE_CORNERS
            .into_iter()
            .map(|corner| Entity::new((corner - centroid) * TRIANGLE_SCALE, Vec2::ZERO, 1.0, None))
            .collect()
    }
}

pub struct CloudPreset;

impl Preset for CloudPreset {
    fn name(&self) -> &str {
        "Cloud"
    }

    fn description(&self) -> &str {
        "Bodies scattered uniformly at rest, collapsing under their own weight"
    }

    fn entities(&self, count: usize, _gravitational_constant: f32, rng: &mut StdRng) -> Vec<Entity> {
        (0..count)
            .map(|_| {
                let pos = Vec2::new(rng.gen_range(-0.9..0.9), rng.gen_range(-0.9..0.9));
                let mass = rng.gen_range(0.5..2.0);
                let colour = hsl_to_rgb(rng.gen_range(0.0..1.0), 0.7, 0.6);
                Entity::new(pos, Vec2::ZERO, mass, Some(colour))
            })
            .collect()
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Colour {
    let h = h.rem_euclid(1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 1.0 / 6.0 {
        (c, x, 0.0)
    } else if h < 2.0 / 6.0 {
        (x, c, 0.0)
    } else if h < 3.0 / 6.0 {
        (0.0, c, x)
    } else if h < 4.0 / 6.0 {
        (0.0, x, c)
    } else if h < 5.0 / 6.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Colour::new(r + m, g + m, b + m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn next_cycles_through_every_preset() {
        let mut kind = PresetKind::default();
        let mut seen = vec![kind];
        for _ in 0..PresetKind::ALL.len() - 1 {
            kind = kind.next();
            seen.push(kind);
        }
        assert_eq!(seen, PresetKind::ALL.to_vec());
        assert_eq!(kind.next(), PresetKind::Galaxy);
    }

    #[test]
    fn same_seed_same_entities() {
        let a = GalaxyPreset.entities(100, 1.0e-4, &mut StdRng::seed_from_u64(7));
        let b = GalaxyPreset.entities(100, 1.0e-4, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn galaxy_orbits_are_circular_around_the_centre() {
        let entities = GalaxyPreset.entities(50, 1.0e-4, &mut StdRng::seed_from_u64(1));
        assert_eq!(entities.len(), 50);
        assert_eq!(entities[0].mass, CENTRAL_MASS);

        for entity in &entities[1..] {
            let radius = entity.pos.length();
            assert!(radius > 0.15 - 1e-5 && radius < 0.8 + 1e-5);
            assert!(entity.pos.dot(entity.vel).abs() < 1e-4);
            let expected = (1.0e-4 * CENTRAL_MASS / radius).sqrt();
            assert!((entity.vel.length() - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn triangle_ignores_the_requested_count() {
        let entities = TrianglePreset.entities(500, 1.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(entities.len(), 3);
        assert!(entities.iter().all(|e| e.mass == 1.0 && e.colour == Colour::WHITE));

        // Right triangle with half-length legs, centred on the origin
        let [a, b, c] = [entities[0].pos, entities[1].pos, entities[2].pos];
        assert!((a + b + c).length() < 1e-6);
        assert!(((b - a).length() - 0.5).abs() < 1e-6);
        assert!(((c - a).length() - 0.5).abs() < 1e-6);
        assert!((b - a).dot(c - a).abs() < 1e-6);
    }

    #[test]
    fn every_preset_is_named_and_described() {
        for kind in PresetKind::ALL {
            let preset = kind.preset();
            assert!(!preset.name().is_empty());
            assert!(!preset.description().is_empty());
        }
    }

    #[test]
    fn cloud_starts_at_rest_inside_the_view() {
        let entities = CloudPreset.entities(200, 1.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(entities.len(), 200);
        assert!(entities.iter().all(|e| e.vel == Vec2::ZERO));
        assert!(entities.iter().all(|e| e.pos.abs().max_element() < 0.9));
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Colour::new(1.0, 0.0, 0.0));
        let green = hsl_to_rgb(1.0 / 3.0, 1.0, 0.5);
        assert!(green.r.abs() < 1e-5 && (green.g - 1.0).abs() < 1e-5 && green.b.abs() < 1e-5);
        assert_eq!(hsl_to_rgb(0.5, 0.0, 0.25), Colour::new(0.25, 0.25, 0.25));
    }
}
