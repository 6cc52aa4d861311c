use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
    /// Hermite spline with stored tangents. Values are laid out as
    /// `[in_tangent, value, out_tangent]` per keyframe.
    CubicSpline,
}

impl InterpolationMode {
    /// Number of stored values per keyframe.
    #[inline]
    #[must_use]
    pub fn stride(self) -> usize {
        match self {
            Self::CubicSpline => 3,
            Self::Linear | Self::Step => 1,
        }
    }
}

/// Structural problem found in a track's keyframe data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFault {
    /// No keyframes at all.
    Empty,
    /// `times[index]` does not strictly follow `times[index - 1]`
    /// (or is not finite).
    Unsorted { index: usize },
    /// Fewer values than `times.len() * stride`.
    ValueCountMismatch { expected: usize, actual: usize },
}

const MAX_SCAN_OFFSET: usize = 3;

/// Remembers the last keyframe interval a track was sampled in, so sequential
/// playback finds the next interval without a search.
#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: InterpolationMode,
    /// Leading keyframes that are strictly increasing, finite and backed by
    /// values. Sampling never looks past this prefix.
    valid_len: usize,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        let backed = (values.len() / interpolation.stride()).min(times.len());
        let valid_len = times[..backed]
            .iter()
            .enumerate()
            .take_while(|&(i, t)| t.is_finite() && (i == 0 || *t > times[i - 1]))
            .count();

        Self {
            times,
            values,
            interpolation,
            valid_len,
        }
    }

    #[inline]
    #[must_use]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    /// Number of keyframes that sampling actually uses.
    #[inline]
    #[must_use]
    pub fn valid_len(&self) -> usize {
        self.valid_len
    }

    /// Time of the last usable keyframe, or `0.0` for an unusable track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self.valid_len {
            0 => 0.0,
            n => self.times[n - 1],
        }
    }

    /// Reports the first structural problem in the keyframe data, if any.
    #[must_use]
    pub fn fault(&self) -> Option<TrackFault> {
        if self.times.is_empty() {
            return Some(TrackFault::Empty);
        }
        let expected = self.times.len() * self.interpolation.stride();
        if self.values.len() < expected {
            return Some(TrackFault::ValueCountMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        if self.valid_len < self.times.len() {
            return Some(TrackFault::Unsorted {
                index: self.valid_len,
            });
        }
        None
    }

    /// Stateless sampling: binary search for the bracketing keyframes.
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        match self.valid_len {
            0 => return T::default(),
            1 => return self.get_value_at(0).clone(),
            _ => {}
        }

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times[..self.valid_len].partition_point(|&t| t <= time);

        self.sample_at_frame(next_idx.saturating_sub(1), time)
    }

    /// Sampling with a cursor.
    ///
    /// Sequential playback (forward or backward) hits a short linear scan from
    /// the cursor; anything else falls back to binary search, so the cost is
    /// bounded by O(log n) either way. The cursor is updated in place.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> T {
        let len = self.valid_len;
        match len {
            0 => return T::default(),
            1 => return self.get_value_at(0).clone(),
            _ => {}
        }

        // A cursor from another track (or a longer clip) may be out of range.
        let i = cursor.last_index.min(len - 1);
        let t_curr = self.times[i];

        let found_index = if time >= t_curr {
            // Forward: check [i, i+1), [i+1, i+2) ... up to MAX_SCAN_OFFSET
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                if idx >= len - 1 {
                    // time >= times[i] and we ran off the end: clamp to last frame
                    res = Some(len - 1);
                    break;
                }
                if time < self.times[idx + 1] {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            // Backward: time < times[i], walk left until times[idx] <= time
            let mut res = None;
            for offset in 1..=MAX_SCAN_OFFSET {
                if i < offset {
                    // Before the first keyframe
                    res = Some(0);
                    break;
                }
                let idx = i - offset;
                if time >= self.times[idx] {
                    res = Some(idx);
                    break;
                }
            }
            res
        };

        let final_index = found_index.unwrap_or_else(|| {
            // Large jump (scrubbing / loop reset): binary search
            let next_idx = self.times[..len].partition_point(|&t| t <= time);
            next_idx.saturating_sub(1)
        });
        cursor.last_index = final_index;

        self.sample_at_frame(final_index, time)
    }

    /// For Linear/Step the value lives at `index`; for CubicSpline at
    /// `index * 3 + 1`.
    #[inline]
    fn get_value_at(&self, index: usize) -> &T {
        match self.interpolation {
            InterpolationMode::CubicSpline => &self.values[index * 3 + 1],
            _ => &self.values[index],
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.valid_len;

        if index >= len - 1 {
            return self.get_value_at(len - 1).clone();
        }

        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => self.get_value_at(index).clone(),
            InterpolationMode::Linear => {
                let v0 = self.get_value_at(index);
                let v1 = self.get_value_at(next_idx);
                T::interpolate_linear(v0, v1, t)
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = &self.values[i_prev + 1];
                let out_tangent0 = &self.values[i_prev + 2];
                let in_tangent1 = &self.values[i_next];
                let v1 = &self.values[i_next + 1];

                T::interpolate_cubic(v0, out_tangent0, in_tangent1, v1, t, dt)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsorted_tail_is_ignored() {
        let track = KeyframeTrack::new(
            vec![0.0, 1.0, 0.5, 2.0],
            vec![0.0_f32, 10.0, 99.0, 20.0],
            InterpolationMode::Linear,
        );
        assert_eq!(track.valid_len(), 2);
        assert_eq!(track.fault(), Some(TrackFault::Unsorted { index: 2 }));
        // Clamps to the last valid keyframe
        assert!((track.sample(5.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn short_values_are_reported() {
        let track = KeyframeTrack::new(vec![0.0, 1.0], vec![1.0_f32], InterpolationMode::Linear);
        assert_eq!(
            track.fault(),
            Some(TrackFault::ValueCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!((track.sample(0.7) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_track_samples_default() {
        let track: KeyframeTrack<f32> = KeyframeTrack::new(vec![], vec![], InterpolationMode::Linear);
        assert_eq!(track.fault(), Some(TrackFault::Empty));
        assert_eq!(track.sample(1.0), 0.0);
        let mut cursor = KeyframeCursor::default();
        assert_eq!(track.sample_with_cursor(1.0, &mut cursor), 0.0);
    }

    #[test]
    fn backward_scan_before_first_key() {
        let track = KeyframeTrack::new(
            vec![1.0, 2.0, 3.0],
            vec![10.0_f32, 20.0, 30.0],
            InterpolationMode::Linear,
        );
        let mut cursor = KeyframeCursor { last_index: 1 };
        assert!((track.sample_with_cursor(0.0, &mut cursor) - 10.0).abs() < 1e-6);
        assert_eq!(cursor.last_index, 0);
    }
}
