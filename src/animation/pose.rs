//! Poses and Pose Layouts
//!
//! A [`Pose`] is the set of sampled values for every animated target at one
//! instant. Targets are addressed by [`TargetId`], a dense index handed out by
//! a [`PoseLayout`] when an animator is built. Poses are plain arrays sized to
//! the layout, so per-layer scratch poses can be reused every frame without
//! allocating.
//!
//! Each target also carries a [`ChannelMask`] recording which channels the
//! producer actually wrote. Composition only touches written channels, which
//! is what lets an upper layer animate an arm without flattening the legs.

use bitflags::bitflags;
use glam::{Affine3A, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::values::MorphWeightData;

/// Dense index of an animated target inside a [`PoseLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

impl TargetId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Channels written for one target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelMask: u8 {
        const TRANSLATION = 1 << 0;
        const ROTATION    = 1 << 1;
        const SCALE       = 1 << 2;
        const WEIGHTS     = 1 << 3;
    }
}

/// Translation / rotation / scale of one target relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Component-wise blend: lerp for translation/scale, shortest-arc slerp for
    /// rotation.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Maps target names to dense [`TargetId`]s and stores each target's rest
/// transform and morph-weight count.
#[derive(Debug, Clone, Default)]
pub struct PoseLayout {
    names: Vec<String>,
    index: FxHashMap<String, TargetId>,
    rest: Vec<LocalTransform>,
    morph_counts: Vec<usize>,
}

impl PoseLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, registering it with an identity rest pose
    /// if it is new.
    pub fn insert(&mut self, name: &str) -> TargetId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = TargetId(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.index.insert(name.to_owned(), id);
        self.rest.push(LocalTransform::IDENTITY);
        self.morph_counts.push(0);
        id
    }

    #[inline]
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TargetId> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, id: TargetId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn rest(&self, id: TargetId) -> Option<&LocalTransform> {
        self.rest.get(id.index())
    }

    /// Returns `false` when `id` is not part of this layout.
    pub fn set_rest(&mut self, id: TargetId, transform: LocalTransform) -> bool {
        match self.rest.get_mut(id.index()) {
            Some(slot) => {
                *slot = transform;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn morph_count(&self, id: TargetId) -> usize {
        self.morph_counts.get(id.index()).copied().unwrap_or(0)
    }

    /// Widens the morph-weight count of `id` to at least `count`.
    pub fn reserve_morph_targets(&mut self, id: TargetId, count: usize) {
        if let Some(slot) = self.morph_counts.get_mut(id.index()) {
            *slot = (*slot).max(count);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (TargetId(i as u32), name.as_str()))
    }
}

/// What untouched channels of a fresh pose hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseBase {
    /// The layout's rest transforms; used by override layers and the composite.
    Rest,
    /// Identity deltas (zero translation, identity rotation, unit scale, zero
    /// weights); used by additive layers.
    Identity,
}

/// Sampled values for every target of a layout.
#[derive(Debug, Clone, Default)]
pub struct Pose {
    transforms: Vec<LocalTransform>,
    weights: Vec<MorphWeightData>,
    channels: Vec<ChannelMask>,
}

impl Pose {
    /// A pose sized to `layout`, holding the rest pose with no channels written.
    #[must_use]
    pub fn with_layout(layout: &PoseLayout) -> Self {
        let mut pose = Self::default();
        pose.reset(layout, PoseBase::Rest);
        pose
    }

    /// Resets every target to `base` and clears the channel masks. Storage is
    /// reused once sized.
    pub fn reset(&mut self, layout: &PoseLayout, base: PoseBase) {
        let len = layout.len();
        self.transforms.resize(len, LocalTransform::IDENTITY);
        self.weights.resize_with(len, MorphWeightData::default);
        self.channels.resize(len, ChannelMask::empty());

        for i in 0..len {
            self.transforms[i] = match base {
                PoseBase::Rest => layout.rest[i],
                PoseBase::Identity => LocalTransform::IDENTITY,
            };
            let weights = &mut self.weights[i].weights;
            weights.clear();
            weights.resize(layout.morph_counts[i], 0.0);
            self.channels[i] = ChannelMask::empty();
        }
    }

    /// Copies `other` into `self` without reallocating.
    pub fn copy_from(&mut self, other: &Pose) {
        self.transforms.clone_from(&other.transforms);
        self.channels.clone_from(&other.channels);
        self.weights.resize_with(other.weights.len(), MorphWeightData::default);
        for (dst, src) in self.weights.iter_mut().zip(&other.weights) {
            dst.copy_from(src);
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn transform(&self, id: TargetId) -> Option<&LocalTransform> {
        self.transforms.get(id.index())
    }

    #[inline]
    #[must_use]
    pub fn weights(&self, id: TargetId) -> Option<&[f32]> {
        self.weights.get(id.index()).map(|w| w.weights.as_slice())
    }

    #[inline]
    #[must_use]
    pub fn channels(&self, id: TargetId) -> ChannelMask {
        self.channels.get(id.index()).copied().unwrap_or_default()
    }

    /// Whether any target has a written channel.
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.channels.iter().any(|c| !c.is_empty())
    }

    pub fn set_translation(&mut self, id: TargetId, value: Vec3) {
        if let Some(t) = self.transforms.get_mut(id.index()) {
            t.translation = value;
            self.channels[id.index()] |= ChannelMask::TRANSLATION;
        }
    }

    pub fn set_rotation(&mut self, id: TargetId, value: Quat) {
        if let Some(t) = self.transforms.get_mut(id.index()) {
            t.rotation = value;
            self.channels[id.index()] |= ChannelMask::ROTATION;
        }
    }

    pub fn set_scale(&mut self, id: TargetId, value: Vec3) {
        if let Some(t) = self.transforms.get_mut(id.index()) {
            t.scale = value;
            self.channels[id.index()] |= ChannelMask::SCALE;
        }
    }

    pub fn set_weights(&mut self, id: TargetId, value: &MorphWeightData) {
        if let Some(w) = self.weights.get_mut(id.index()) {
            let count = w.len().max(value.len());
            w.copy_from(value);
            w.ensure_len(count);
            self.channels[id.index()] |= ChannelMask::WEIGHTS;
        }
    }

    pub fn set_weight(&mut self, id: TargetId, index: usize, value: f32) {
        if let Some(w) = self.weights.get_mut(id.index()) {
            w.ensure_len(index + 1);
            w.weights[index] = value;
            self.channels[id.index()] |= ChannelMask::WEIGHTS;
        }
    }

    /// `self = lerp(a, b, t)` for every target; written channels are the union
    /// of both inputs. `a` and `b` must share a layout and base.
    pub fn blend(&mut self, a: &Pose, b: &Pose, t: f32) {
        self.copy_from(a);
        for i in 0..self.transforms.len().min(b.transforms.len()) {
            if (a.channels[i] | b.channels[i]).is_empty() {
                continue;
            }
            self.transforms[i] = a.transforms[i].lerp(&b.transforms[i], t);
            lerp_weights(&mut self.weights[i], &b.weights[i], t);
            self.channels[i] |= b.channels[i];
        }
    }

    /// Blends the written channels of `layer` over `self` by `weight`
    /// (scaled per target by `mask`). Weight 1 replaces the value outright.
    pub fn override_with(&mut self, layer: &Pose, weight: f32, mask: Option<&[f32]>) {
        for i in 0..self.transforms.len().min(layer.transforms.len()) {
            let channels = layer.channels[i];
            let w = weight * mask_weight(mask, i);
            if channels.is_empty() || w <= 0.0 {
                continue;
            }
            let src = &layer.transforms[i];
            let dst = &mut self.transforms[i];
            if w >= 1.0 {
                if channels.contains(ChannelMask::TRANSLATION) {
                    dst.translation = src.translation;
                }
                if channels.contains(ChannelMask::ROTATION) {
                    dst.rotation = src.rotation;
                }
                if channels.contains(ChannelMask::SCALE) {
                    dst.scale = src.scale;
                }
                if channels.contains(ChannelMask::WEIGHTS) {
                    self.weights[i].copy_from(&layer.weights[i]);
                }
            } else {
                if channels.contains(ChannelMask::TRANSLATION) {
                    dst.translation = dst.translation.lerp(src.translation, w);
                }
                if channels.contains(ChannelMask::ROTATION) {
                    dst.rotation = dst.rotation.slerp(src.rotation, w);
                }
                if channels.contains(ChannelMask::SCALE) {
                    dst.scale = dst.scale.lerp(src.scale, w);
                }
                if channels.contains(ChannelMask::WEIGHTS) {
                    lerp_weights(&mut self.weights[i], &layer.weights[i], w);
                }
            }
            self.channels[i] |= channels;
        }
    }

    /// Applies the written channels of the delta pose `layer` on top of `self`:
    /// translations and weights add `delta * weight`, rotations post-multiply
    /// `slerp(identity, delta, weight)`, scales multiply `lerp(1, delta, weight)`.
    pub fn add_weighted(&mut self, layer: &Pose, weight: f32, mask: Option<&[f32]>) {
        for i in 0..self.transforms.len().min(layer.transforms.len()) {
            let channels = layer.channels[i];
            let w = weight * mask_weight(mask, i);
            if channels.is_empty() || w <= 0.0 {
                continue;
            }
            let delta = &layer.transforms[i];
            let dst = &mut self.transforms[i];
            if channels.contains(ChannelMask::TRANSLATION) {
                dst.translation += delta.translation * w;
            }
            if channels.contains(ChannelMask::ROTATION) {
                let scaled = Quat::IDENTITY.slerp(delta.rotation, w);
                dst.rotation = (dst.rotation * scaled).normalize();
            }
            if channels.contains(ChannelMask::SCALE) {
                dst.scale *= Vec3::ONE.lerp(delta.scale, w);
            }
            if channels.contains(ChannelMask::WEIGHTS) {
                let add = &layer.weights[i];
                let out = &mut self.weights[i];
                out.ensure_len(add.len());
                for (o, a) in out.weights.iter_mut().zip(&add.weights) {
                    *o += a * w;
                }
            }
            self.channels[i] |= channels;
        }
    }

    /// Iterates targets with at least one written channel.
    pub fn animated(&self) -> impl Iterator<Item = (TargetId, &LocalTransform, ChannelMask)> {
        self.transforms
            .iter()
            .zip(&self.channels)
            .enumerate()
            .filter(|(_, (_, c))| !c.is_empty())
            .map(|(i, (t, c))| (TargetId(i as u32), t, *c))
    }
}

#[inline]
fn mask_weight(mask: Option<&[f32]>, index: usize) -> f32 {
    mask.map_or(1.0, |m| m.get(index).copied().unwrap_or(0.0))
}

/// In-place `a = lerp(a, b, t)` over the longer of the two weight vectors.
fn lerp_weights(a: &mut MorphWeightData, b: &MorphWeightData, t: f32) {
    a.ensure_len(b.len());
    for (i, out) in a.weights.iter_mut().enumerate() {
        let target = b.weights.get(i).copied().unwrap_or(0.0);
        *out += (target - *out) * t;
    }
}
