use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::animation::animator::Animator;
use crate::animation::target::{NullSink, PoseSink};
use crate::scene::Rig;

new_key_type! {
    /// Handle of an [`Animator`] owned by an [`AnimationSystem`].
    pub struct AnimatorHandle;
}

/// Where the system sends each animator's pose, and whether that animator's
/// output is visible.
pub trait AnimationHost {
    /// Output for `handle`; `None` evaluates the animator without pushing.
    fn pose_sink(&mut self, handle: AnimatorHandle) -> Option<&mut dyn PoseSink>;

    fn is_visible(&self, handle: AnimatorHandle) -> bool;
}

/// One [`Rig`] per animator.
impl AnimationHost for SecondaryMap<AnimatorHandle, Rig> {
    fn pose_sink(&mut self, handle: AnimatorHandle) -> Option<&mut dyn PoseSink> {
        self.get_mut(handle).map(|rig| rig as &mut dyn PoseSink)
    }

    fn is_visible(&self, handle: AnimatorHandle) -> bool {
        self.get(handle).is_some_and(|rig| rig.visible)
    }
}

/// Animation system.
///
/// Owns every live [`Animator`] and ticks them once per frame, in insertion
/// order, before transforms are propagated.
#[derive(Debug, Default)]
pub struct AnimationSystem {
    animators: SlotMap<AnimatorHandle, Animator>,
}

impl AnimationSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, animator: Animator) -> AnimatorHandle {
        self.animators.insert(animator)
    }

    pub fn remove(&mut self, handle: AnimatorHandle) -> Option<Animator> {
        self.animators.remove(handle)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: AnimatorHandle) -> Option<&Animator> {
        self.animators.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: AnimatorHandle) -> Option<&mut Animator> {
        self.animators.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.animators.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnimatorHandle, &Animator)> {
        self.animators.iter()
    }

    /// Updates all animators.
    ///
    /// # Arguments
    /// * `dt` - Delta time per frame (in seconds)
    /// * `host` - Supplies each animator's sink and visibility
    pub fn update(&mut self, dt: f32, host: &mut dyn AnimationHost) {
        for (handle, animator) in &mut self.animators {
            let visible = host.is_visible(handle);
            match host.pose_sink(handle) {
                Some(sink) => animator.update(dt, sink, &visible),
                None => animator.update(dt, &mut NullSink, &visible),
            }
        }
    }
}
