use glam::Vec2;

use crate::error::EncodeError;
use crate::simulation::types::{COLOUR_FLOATS, KINEMATIC_FLOATS};

/// RGB colour, conceptually in `[0, 1]` but never clamped.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    pub const WHITE: Colour = Colour::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A simulated point mass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Entity {
    pub pos: Vec2,
    pub vel: Vec2,
    pub mass: f32,
    pub colour: Colour,
}

impl Entity {
    /// Missing colour means opaque white.
    pub fn new(pos: Vec2, vel: Vec2, mass: f32, colour: Option<Colour>) -> Self {
        Self {
            pos,
            vel,
            mass,
            colour: colour.unwrap_or_default(),
        }
    }

    fn validate(&self, index: usize) -> Result<(), EncodeError> {
        let fields = [
            ("position", self.pos.is_finite()),
            ("velocity", self.vel.is_finite()),
            ("mass", self.mass.is_finite()),
            (
                "colour",
                self.colour.r.is_finite() && self.colour.g.is_finite() && self.colour.b.is_finite(),
            ),
        ];
        match fields.iter().find(|(_, finite)| !finite) {
            Some(&(field, _)) => Err(EncodeError::NonFinite { index, field }),
            None => Ok(()),
        }
    }
}

/// Flat buffers ready for upload: 6 floats of kinematic state and 3 floats
/// of colour per entity, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedEntities {
    kinematics: Vec<f32>,
    colours: Vec<f32>,
}

impl EncodedEntities {
    pub fn entity_count(&self) -> usize {
        self.kinematics.len() / KINEMATIC_FLOATS
    }

    pub fn kinematics(&self) -> &[f32] {
        &self.kinematics
    }

    pub fn colours(&self) -> &[f32] {
        &self.colours
    }

    pub fn kinematic_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.kinematics)
    }

    pub fn colour_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colours)
    }
}

/// Packs entities into `[pos.x, pos.y, vel.x, vel.y, mass, 0]` and `[r, g, b]` records.
pub fn encode_entities(entities: &[Entity]) -> Result<EncodedEntities, EncodeError> {
    let mut kinematics = Vec::with_capacity(entities.len() * KINEMATIC_FLOATS);
    let mut colours = Vec::with_capacity(entities.len() * COLOUR_FLOATS);

    for (index, entity) in entities.iter().enumerate() {
        entity.validate(index)?;
        kinematics.extend_from_slice(&[
            entity.pos.x,
            entity.pos.y,
            entity.vel.x,
            entity.vel.y,
            entity.mass,
            0.0,
        ]);
        colours.extend_from_slice(&[entity.colour.r, entity.colour.g, entity.colour.b]);
    }

    Ok(EncodedEntities {
        kinematics,
        colours,
    })
}

/// Inverse of [`encode_entities`]. The padding slot is ignored.
pub fn decode_entities(kinematics: &[f32], colours: &[f32]) -> Result<Vec<Entity>, EncodeError> {
    if kinematics.len() % KINEMATIC_FLOATS != 0 {
        return Err(EncodeError::MisalignedBuffer {
            len: kinematics.len(),
            stride: KINEMATIC_FLOATS,
        });
    }
    if colours.len() % COLOUR_FLOATS != 0 {
        return Err(EncodeError::MisalignedBuffer {
            len: colours.len(),
            stride: COLOUR_FLOATS,
        });
    }

    let kinematic_records = kinematics.len() / KINEMATIC_FLOATS;
    let colour_records = colours.len() / COLOUR_FLOATS;
    if kinematic_records != colour_records {
        return Err(EncodeError::LengthMismatch {
            kinematic_records,
            colour_records,
        });
    }

    Ok(kinematics
        .chunks_exact(KINEMATIC_FLOATS)
        .zip(colours.chunks_exact(COLOUR_FLOATS))
        .map(|(k, c)| Entity {
            pos: Vec2::new(k[0], k[1]),
            vel: Vec2::new(k[2], k[3]),
            mass: k[4],
            colour: Colour::new(c[0], c[1], c[2]),
        })
        .collect())
}
