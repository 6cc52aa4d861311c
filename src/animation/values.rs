use glam::{Quat, Vec3, Vec4};
use smallvec::SmallVec;

/// Morph targets stored inline before spilling to the heap.
pub const INLINE_MORPH_TARGETS: usize = 8;

/// A value type that keyframe tracks can interpolate.
///
/// `Default` is the value reported by a track that has no usable keyframes.
/// Such tracks are never bound to a pose, so it only matters for direct
/// sampling calls.
pub trait Interpolatable: Clone + Default {
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self;

    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self;
}

/// Hermite basis for `t`: `(s0, s1, s2, s3)` weighting
/// `v0`, `out_tangent0 * dt`, `v1`, `in_tangent1 * dt`.
#[inline]
fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;

    let s2 = -2.0 * t3 + 3.0 * t2;
    let s3 = t3 - t2;
    let s0 = 1.0 - s2;
    let s1 = s3 - t2 + t;
    (s0, s1, s2, s3)
}

/// Blend-shape weights for one target.
///
/// The length is the number of morph targets on the mesh; tracks that feed
/// different lengths are blended over the shorter one and the tail is kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MorphWeightData {
    pub weights: SmallVec<[f32; INLINE_MORPH_TARGETS]>,
}

impl MorphWeightData {
    /// Zeroed weights for `count` morph targets.
    #[must_use]
    pub fn allocate(count: usize) -> Self {
        Self {
            weights: SmallVec::from_elem(0.0, count),
        }
    }

    #[must_use]
    pub fn from_slice(weights: &[f32]) -> Self {
        Self {
            weights: SmallVec::from_slice(weights),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Copies `other` into `self`, reusing the existing storage.
    pub fn copy_from(&mut self, other: &Self) {
        self.weights.clear();
        self.weights.extend_from_slice(&other.weights);
    }

    /// Grows to at least `count` entries, padding with zero.
    pub fn ensure_len(&mut self, count: usize) {
        if self.weights.len() < count {
            self.weights.resize(count, 0.0);
        }
    }
}

impl Interpolatable for MorphWeightData {
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        let len = start.len().max(end.len());
        let mut result = MorphWeightData::allocate(len);
        for (i, out) in result.weights.iter_mut().enumerate() {
            let a = start.weights.get(i).copied().unwrap_or(0.0);
            let b = end.weights.get(i).copied().unwrap_or(0.0);
            *out = a + (b - a) * t;
        }
        result
    }

    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        let len = v0.len().max(v1.len());
        let at = |w: &Self, i: usize| w.weights.get(i).copied().unwrap_or(0.0);

        let mut result = MorphWeightData::allocate(len);
        for (i, out) in result.weights.iter_mut().enumerate() {
            let m0 = at(out_tangent0, i) * dt;
            let m1 = at(in_tangent1, i) * dt;
            *out = s0 * at(v0, i) + s1 * m0 + s2 * at(v1, i) + s3 * m1;
        }
        result
    }
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start + (end - start) * t
    }

    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        let m0 = out_tangent0 * dt;
        let m1 = in_tangent1 * dt;

        s0 * v0 + s1 * m0 + s2 * v1 + s3 * m1
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start.lerp(*end, t)
    }

    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        let m0 = *out_tangent0 * dt;
        let m1 = *in_tangent1 * dt;

        *v0 * s0 + m0 * s1 + *v1 * s2 + m1 * s3
    }
}

impl Interpolatable for Quat {
    /// Shortest-arc spherical interpolation.
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start.slerp(*end, t)
    }

    fn interpolate_cubic(
        v0: &Self,
        out_tangent0: &Self,
        in_tangent1: &Self,
        v1: &Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);

        let v0_v = Vec4::from(*v0);
        let v1_v = Vec4::from(*v1);
        let m0_v = Vec4::from(*out_tangent0) * dt;
        let m1_v = Vec4::from(*in_tangent1) * dt;

        let result = v0_v * s0 + m0_v * s1 + v1_v * s2 + m1_v * s3;

        Quat::from_vec4(result).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_lerp_pads_shorter_side() {
        let a = MorphWeightData::from_slice(&[1.0]);
        let b = MorphWeightData::from_slice(&[0.0, 1.0]);
        let mid = MorphWeightData::interpolate_linear(&a, &b, 0.5);
        assert_eq!(mid.len(), 2);
        assert!((mid.weights[0] - 0.5).abs() < 1e-6);
        assert!((mid.weights[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hermite_basis_partitions_unity_at_ends() {
        let (s0, s1, s2, s3) = hermite_basis(0.0);
        assert_eq!((s0, s1, s2, s3), (1.0, 0.0, 0.0, 0.0));
        let (s0, s1, s2, s3) = hermite_basis(1.0);
        assert_eq!((s0, s1, s2, s3), (0.0, 0.0, 1.0, 0.0));
    }
}
