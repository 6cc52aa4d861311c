use std::sync::Arc;

use crate::animation::clip::AnimationClip;
use crate::animation::tracks::KeyframeCursor;

/// Stable index of a state inside its [`StateMachine`](crate::animation::StateMachine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Policy for playback time beyond a clip's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Wraps modulo the duration.
    #[default]
    Loop,
    /// Clamps at either end and marks the playback finished.
    Once,
    /// Reflects at either end.
    PingPong,
    /// Clamps at either end and keeps playing the boundary pose.
    ClampForever,
}

impl WrapMode {
    /// Folds an unbounded playback time into the stored range: `[0, d)` for
    /// `Loop`, `[0, 2d)` for `PingPong`, `[0, d]` for the clamping modes.
    #[must_use]
    pub fn fold(self, time: f32, duration: f32) -> f32 {
        if duration <= 0.0 || !time.is_finite() {
            return 0.0;
        }
        match self {
            Self::Loop => wrap_positive(time, duration),
            Self::PingPong => wrap_positive(time, duration * 2.0),
            Self::Once | Self::ClampForever => time.clamp(0.0, duration),
        }
    }

    /// Whether moving to `unfolded` (in the direction of `delta`) ends the
    /// playback. Only `Once` ever finishes.
    #[must_use]
    pub fn finishes(self, unfolded: f32, delta: f32, duration: f32) -> bool {
        if self != Self::Once {
            return false;
        }
        (delta > 0.0 && unfolded >= duration) || (delta < 0.0 && unfolded <= 0.0)
    }

    /// Maps a folded time to the clip-local time that is sampled.
    #[must_use]
    pub fn local_time(self, folded: f32, duration: f32) -> f32 {
        if duration <= 0.0 {
            return 0.0;
        }
        match self {
            Self::PingPong if folded > duration => duration * 2.0 - folded,
            _ => folded,
        }
    }
}

#[inline]
fn wrap_positive(time: f32, period: f32) -> f32 {
    let t = time.rem_euclid(period);
    // rem_euclid can round up to `period` for tiny negative inputs
    if t >= period { 0.0 } else { t }
}

/// A named, parameterized wrapper around a shared clip.
///
/// States are authored once and then shared read-only by every animator whose
/// controller references the owning state machine.
#[derive(Debug, Clone)]
pub struct AnimatorState {
    pub(crate) id: StateId,
    name: String,
    clip: Arc<AnimationClip>,
    pub speed: f32,
    pub wrap_mode: WrapMode,
}

impl AnimatorState {
    #[must_use]
    pub fn new(name: impl Into<String>, clip: Arc<AnimationClip>) -> Self {
        Self {
            id: StateId(0),
            name: name.into(),
            clip,
            speed: 1.0,
            wrap_mode: WrapMode::Loop,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    /// Id assigned by the owning state machine.
    #[inline]
    #[must_use]
    pub fn id(&self) -> StateId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.clip.duration
    }

    /// Whether this state repeats its clip and therefore needs a non-zero
    /// duration.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        matches!(self.wrap_mode, WrapMode::Loop | WrapMode::PingPong)
    }
}

/// Playback position of one state on one layer.
#[derive(Debug, Clone)]
pub struct StatePlayback {
    pub(crate) state: StateId,
    /// Folded time, see [`WrapMode::fold`].
    pub(crate) time: f32,
    pub(crate) finished: bool,
    pub(crate) cursors: Vec<KeyframeCursor>,
}

impl StatePlayback {
    /// Starts `state` at `normalized_time × duration`.
    #[must_use]
    pub fn start(state: &AnimatorState, normalized_time: f32) -> Self {
        let time = state
            .wrap_mode
            .fold(normalized_time * state.duration(), state.duration());
        Self {
            state: state.id,
            time,
            finished: false,
            cursors: vec![KeyframeCursor::default(); state.clip.tracks.len()],
        }
    }

    /// Starts `state` at the end it plays away from: the beginning for forward
    /// speeds, the end for backward ones.
    #[must_use]
    pub fn start_from_edge(state: &AnimatorState, speed_sign: f32) -> Self {
        let mut playback = Self::start(state, 0.0);
        if speed_sign < 0.0 && state.duration() > 0.0 {
            playback.time = match state.wrap_mode {
                // Loop folds into [0, d): start just inside the end
                WrapMode::Loop => state.duration() - f32::EPSILON * state.duration(),
                WrapMode::PingPong | WrapMode::Once | WrapMode::ClampForever => state.duration(),
            };
        }
        playback
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Folded playback time in seconds.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances by `delta` seconds of clip time (already scaled by speeds).
    ///
    /// A finished playback stays put until `delta` points back into the clip.
    pub fn advance(&mut self, state: &AnimatorState, delta: f32) {
        if delta == 0.0 {
            return;
        }
        if self.finished {
            let reenters = (delta < 0.0 && self.time >= state.duration())
                || (delta > 0.0 && self.time <= 0.0);
            if !reenters {
                return;
            }
            self.finished = false;
        }
        let unfolded = self.time + delta;
        self.finished = state.wrap_mode.finishes(unfolded, delta, state.duration());
        self.time = state.wrap_mode.fold(unfolded, state.duration());
    }

    /// Clip-local time to sample at.
    #[must_use]
    pub fn local_time(&self, state: &AnimatorState) -> f32 {
        state.wrap_mode.local_time(self.time, state.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_folds_modulo_duration() {
        assert!((WrapMode::Loop.fold(2.5, 2.0) - 0.5).abs() < 1e-6);
        assert!((WrapMode::Loop.fold(-0.5, 2.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn once_clamps_and_finishes_in_travel_direction() {
        assert_eq!(WrapMode::Once.fold(3.0, 2.0), 2.0);
        assert_eq!(WrapMode::Once.fold(-1.0, 2.0), 0.0);
        assert!(WrapMode::Once.finishes(3.0, 1.0, 2.0));
        assert!(WrapMode::Once.finishes(-0.1, -1.0, 2.0));
        // Sitting at the start while moving forward is not the end
        assert!(!WrapMode::Once.finishes(0.5, 0.5, 2.0));
        assert!(!WrapMode::ClampForever.finishes(3.0, 1.0, 2.0));
    }

    #[test]
    fn ping_pong_reflects() {
        let folded = WrapMode::PingPong.fold(2.5, 2.0);
        assert!((WrapMode::PingPong.local_time(folded, 2.0) - 1.5).abs() < 1e-6);
        let folded = WrapMode::PingPong.fold(4.5, 2.0);
        assert!((WrapMode::PingPong.local_time(folded, 2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn finished_once_resumes_when_reversed() {
        let mut clip = AnimationClip::new("empty", Vec::new());
        clip.duration = 2.0;
        let state = AnimatorState::new("once", Arc::new(clip)).with_wrap_mode(WrapMode::Once);
        let mut playback = StatePlayback::start(&state, 0.0);

        playback.advance(&state, 3.0);
        assert!(playback.is_finished());
        playback.advance(&state, 1.0);
        assert_eq!(playback.time(), 2.0);

        playback.advance(&state, -0.5);
        assert!(!playback.is_finished());
        assert!((playback.time() - 1.5).abs() < 1e-6);

        playback.advance(&state, -2.0);
        assert!(playback.is_finished());
        assert_eq!(playback.time(), 0.0);
        playback.advance(&state, -1.0);
        assert_eq!(playback.time(), 0.0);
    }

    #[test]
    fn zero_duration_pins_to_start() {
        assert_eq!(WrapMode::Loop.fold(5.0, 0.0), 0.0);
        assert_eq!(WrapMode::PingPong.local_time(1.0, 0.0), 0.0);
    }
}
