//! Output and visibility seams.
//!
//! The runtime never owns the scene graph. After compositing, an animator
//! pushes its pose through a [`PoseSink`]; when culling is enabled it asks a
//! [`VisibilityQuery`] whether anything it drives is on screen.

use crate::animation::pose::{LocalTransform, TargetId};

/// Receives the composited pose once per evaluated frame.
pub trait PoseSink {
    /// Local transform of one animated target.
    fn set_pose(&mut self, target: TargetId, transform: &LocalTransform);

    /// One blend-shape (morph target) weight of one animated target.
    fn set_blend_shape_weight(&mut self, target: TargetId, index: usize, weight: f32);
}

/// Discards everything; for evaluating an animator without an output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PoseSink for NullSink {
    fn set_pose(&mut self, _target: TargetId, _transform: &LocalTransform) {}

    fn set_blend_shape_weight(&mut self, _target: TargetId, _index: usize, _weight: f32) {}
}

/// "Is any renderer driven by this animator currently visible?"
pub trait VisibilityQuery {
    fn is_visible(&self) -> bool;
}

impl VisibilityQuery for bool {
    #[inline]
    fn is_visible(&self) -> bool {
        *self
    }
}

impl<F: Fn() -> bool> VisibilityQuery for F {
    #[inline]
    fn is_visible(&self) -> bool {
        self()
    }
}
