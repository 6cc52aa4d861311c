use crate::animation::pose::TargetId;

/// Defines the target property for animation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetPath {
    Translation, // Maps to transform.position
    Rotation,    // Maps to transform.rotation
    Scale,       // Maps to transform.scale
    Weights,     // Maps to all morph target weights
    Weight(u16), // Maps to a single morph target weight
}

/// Binding relationship: maps track `track_index` of a clip to a channel of
/// the pose slot `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackBinding {
    pub track_index: usize,
    pub target: TargetId,
    pub path: TargetPath,
}
