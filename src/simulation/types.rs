use bytemuck::{Pod, Zeroable};

// Constants for simulation
pub const COMPUTE_WORKGROUP_SIZE: u32 = 64;
pub const KINEMATIC_FLOATS: usize = 6;
pub const COLOUR_FLOATS: usize = 3;
pub const KINEMATIC_STRIDE: u64 = std::mem::size_of::<KinematicRecord>() as u64;
pub const COLOUR_STRIDE: u64 = std::mem::size_of::<ColourRecord>() as u64;

// Packed simulable state of one entity, as read and written by the compute shader
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct KinematicRecord {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub mass: f32,
    pub _pad: f32, // alignment only, always zero
}

// Static per-entity colour, never double buffered
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColourRecord {
    pub rgb: [f32; 3],
}

/// Number of workgroups needed so every entity index gets an invocation.
pub fn dispatch_workgroups(entity_count: u32) -> u32 {
    entity_count.div_ceil(COMPUTE_WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_match_the_gpu_layout() {
        assert_eq!(KINEMATIC_STRIDE, 24);
        assert_eq!(COLOUR_STRIDE, 12);
        assert_eq!(KINEMATIC_STRIDE as usize, KINEMATIC_FLOATS * 4);
        assert_eq!(COLOUR_STRIDE as usize, COLOUR_FLOATS * 4);
    }

    #[test]
    fn dispatch_covers_every_entity() {
        assert_eq!(dispatch_workgroups(0), 0);
        assert_eq!(dispatch_workgroups(1), 1);
        assert_eq!(dispatch_workgroups(63), 1);
        assert_eq!(dispatch_workgroups(64), 1);
        assert_eq!(dispatch_workgroups(65), 2);
        assert_eq!(dispatch_workgroups(128), 2);
        assert_eq!(dispatch_workgroups(129), 3);

        for n in 0..1000u32 {
            let groups = dispatch_workgroups(n);
            assert!(groups * COMPUTE_WORKGROUP_SIZE >= n);
            assert!(groups == 0 || (groups - 1) * COMPUTE_WORKGROUP_SIZE < n);
        }
    }
}
