//! Layer Runtime
//!
//! [`LayerRuntime`] is the per-entity, per-layer evaluator. Its whole
//! transition state lives in one tagged enum, [`LayerPhase`]:
//!
//! ```text
//!              play                 cross_fade              cross_fade
//!   Standby ─────────▶ Playing ─────────────▶ CrossFading ─────────────▶ FixedCrossFading ─┐
//!                        ▲  ▲                      │                          │   ▲         │ cross_fade
//!                        │  └──── completion ──────┘                          │   └─────────┘
//!                        └─────────────────────── completion ─────────────────┘
//! ```
//!
//! `play` returns any phase directly to `Playing`. No phase is terminal.
//!
//! # Overlapping crossfades
//!
//! A `cross_fade` that arrives while a crossfade is still blending does not
//! restart the blend with the caller's new duration. The destination that was
//! fading in becomes the new source, the requested state becomes the new
//! destination, and the transition keeps the duration of the crossfade that
//! was originally requested. Further requests while `FixedCrossFading` re-base
//! the same way and keep that locked duration until the layer is back to
//! `Playing`.
//!
//! A re-based blend does not start from the old destination alone. The layer
//! pose last produced (the blend that was on screen) is frozen and faded into
//! the new destination, so the request never pops.
//!
//! Requests for the state that is already the target are not special: a
//! playing state crossfades into a restarted copy of itself, and a running
//! crossfade re-bases onto a restarted copy of its destination.

use std::sync::Arc;

use crate::animation::binding::{TargetPath, TrackBinding};
use crate::animation::clip::TrackData;
use crate::animation::controller::{LayerBlendMode, LayerDefinition};
use crate::animation::pose::{Pose, PoseBase, PoseLayout};
use crate::animation::state::{AnimatorState, StatePlayback, StateId};
use crate::animation::state_machine::StateMachine;

/// Coarse phase of a layer, without the associated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Standby,
    Playing,
    CrossFading,
    FixedCrossFading,
}

/// A blend from `source` into `dest`.
#[derive(Debug, Clone)]
pub struct CrossFade {
    pub(crate) source: StatePlayback,
    pub(crate) dest: StatePlayback,
    pub(crate) elapsed: f32,
    pub(crate) duration: f32,
}

impl CrossFade {
    #[inline]
    #[must_use]
    pub fn source(&self) -> &StatePlayback {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn dest(&self) -> &StatePlayback {
        &self.dest
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Blend ratio `clamp(elapsed / duration, 0, 1)`.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

/// Full transition state of a layer.
#[derive(Debug, Clone, Default)]
pub enum LayerPhase {
    /// Nothing has been played yet; the layer contributes nothing.
    #[default]
    Standby,
    Playing {
        current: StatePlayback,
    },
    CrossFading(CrossFade),
    /// A crossfade re-based by an overlapping request; its duration is locked.
    FixedCrossFading(CrossFade),
}

impl LayerPhase {
    #[must_use]
    pub fn state(&self) -> LayerState {
        match self {
            Self::Standby => LayerState::Standby,
            Self::Playing { .. } => LayerState::Playing,
            Self::CrossFading(_) => LayerState::CrossFading,
            Self::FixedCrossFading(_) => LayerState::FixedCrossFading,
        }
    }

    #[must_use]
    pub fn cross_fade(&self) -> Option<&CrossFade> {
        match self {
            Self::CrossFading(fade) | Self::FixedCrossFading(fade) => Some(fade),
            Self::Standby | Self::Playing { .. } => None,
        }
    }
}

/// What a `cross_fade` request did to the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossFadeOutcome {
    /// `Playing` → `CrossFading`.
    Started,
    /// Overlapping request: re-based into `FixedCrossFading`.
    Fixed,
    /// Switched without blending (standby layer or non-positive duration).
    Immediate,
    /// The state id does not belong to the layer's machine.
    Ignored,
}

/// Scratch poses for sampling both sides of a crossfade. One set per animator.
#[derive(Debug, Clone, Default)]
pub(crate) struct CrossFadeScratch {
    pub(crate) source: Pose,
    pub(crate) dest: Pose,
}

/// Stateful evaluator for one layer of one animator.
#[derive(Debug, Clone)]
pub struct LayerRuntime {
    name: String,
    machine: Arc<StateMachine>,
    /// Track bindings per state, indexed by `StateId`.
    bindings: Vec<Vec<TrackBinding>>,
    blend_mode: LayerBlendMode,
    weight: f32,
    mask: Option<Vec<f32>>,
    phase: LayerPhase,
    /// Frozen source of a `FixedCrossFading` blend.
    fixed_source: Pose,
    /// Set by a re-base; the next `evaluate` freezes the previous layer pose.
    capture_pending: bool,
}

impl LayerRuntime {
    pub(crate) fn new(
        def: &LayerDefinition,
        bindings: Vec<Vec<TrackBinding>>,
        layout: &PoseLayout,
    ) -> Self {
        Self {
            name: def.name.clone(),
            machine: Arc::clone(&def.state_machine),
            bindings,
            blend_mode: def.blend_mode,
            weight: def.weight.clamp(0.0, 1.0),
            mask: def.mask.as_ref().map(|m| m.resolve(layout)),
            phase: LayerPhase::Standby,
            fixed_source: Pose::default(),
            capture_pending: false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn state_machine(&self) -> &Arc<StateMachine> {
        &self.machine
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> LayerBlendMode {
        self.blend_mode
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 1.0);
    }

    /// Resolved per-target mask weights, if the layer is masked.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> Option<&[f32]> {
        self.mask.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> &LayerPhase {
        &self.phase
    }

    #[inline]
    #[must_use]
    pub fn layer_state(&self) -> LayerState {
        self.phase.state()
    }

    /// Playback sampled as "current": the source while crossfading.
    #[must_use]
    pub fn current_playback(&self) -> Option<&StatePlayback> {
        match &self.phase {
            LayerPhase::Standby => None,
            LayerPhase::Playing { current } => Some(current),
            LayerPhase::CrossFading(fade) | LayerPhase::FixedCrossFading(fade) => {
                Some(&fade.source)
            }
        }
    }

    #[must_use]
    pub fn dest_playback(&self) -> Option<&StatePlayback> {
        self.phase.cross_fade().map(|fade| &fade.dest)
    }

    #[must_use]
    pub fn current_state(&self) -> Option<&AnimatorState> {
        self.current_playback()
            .and_then(|p| self.machine.state(p.state))
    }

    #[must_use]
    pub fn dest_state(&self) -> Option<&AnimatorState> {
        self.dest_playback().and_then(|p| self.machine.state(p.state))
    }

    #[must_use]
    pub fn current_time(&self) -> Option<f32> {
        self.current_playback().map(StatePlayback::time)
    }

    #[must_use]
    pub fn dest_time(&self) -> Option<f32> {
        self.dest_playback().map(StatePlayback::time)
    }

    #[must_use]
    pub fn cross_fade_duration(&self) -> Option<f32> {
        self.phase.cross_fade().map(CrossFade::duration)
    }

    #[must_use]
    pub fn cross_fade_elapsed(&self) -> Option<f32> {
        self.phase.cross_fade().map(CrossFade::elapsed)
    }

    #[must_use]
    pub fn is_fixed_cross_fade(&self) -> bool {
        matches!(self.phase, LayerPhase::FixedCrossFading(_))
    }

    #[must_use]
    pub fn is_in_transition(&self) -> bool {
        self.phase.cross_fade().is_some()
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Switches to `id` immediately at `normalized_time × duration`, dropping
    /// any crossfade in progress.
    pub fn play(&mut self, id: StateId, normalized_time: f32) {
        let Some(state) = self.machine.state(id) else {
            return;
        };
        self.phase = LayerPhase::Playing {
            current: StatePlayback::start(state, normalized_time),
        };
        self.capture_pending = false;
    }

    /// Requests a blend into `id` over `duration` seconds.
    pub fn cross_fade(&mut self, id: StateId, duration: f32) -> CrossFadeOutcome {
        let Some(state) = self.machine.state(id) else {
            return CrossFadeOutcome::Ignored;
        };

        let phase = std::mem::take(&mut self.phase);

        if !(duration.is_finite() && duration > 0.0) {
            self.phase = LayerPhase::Playing {
                current: StatePlayback::start_from_edge(state, state.speed),
            };
            self.capture_pending = false;
            return CrossFadeOutcome::Immediate;
        }

        let (phase, outcome) = match phase {
            LayerPhase::Standby => (
                LayerPhase::Playing {
                    current: StatePlayback::start(state, 0.0),
                },
                CrossFadeOutcome::Immediate,
            ),
            LayerPhase::Playing { current } => (
                LayerPhase::CrossFading(CrossFade {
                    source: current,
                    dest: StatePlayback::start_from_edge(state, state.speed),
                    elapsed: 0.0,
                    duration,
                }),
                CrossFadeOutcome::Started,
            ),
            LayerPhase::CrossFading(fade) | LayerPhase::FixedCrossFading(fade) => (
                LayerPhase::FixedCrossFading(CrossFade {
                    source: fade.dest,
                    dest: StatePlayback::start_from_edge(state, state.speed),
                    elapsed: 0.0,
                    // Locked to the originally requested duration
                    duration: fade.duration,
                }),
                CrossFadeOutcome::Fixed,
            ),
        };

        if outcome == CrossFadeOutcome::Fixed {
            self.capture_pending = true;
        }
        self.phase = phase;
        outcome
    }

    // ========================================================================
    // Per-frame evaluation
    // ========================================================================

    /// Advances clocks by `dt × speed × state.speed`, advances the crossfade
    /// by `dt × |speed|`, samples into `out` and resolves a finished crossfade.
    ///
    /// `out` must hold this layer's pose from the previous call; a pending
    /// re-base freezes it as the fixed source.
    pub(crate) fn evaluate(
        &mut self,
        dt: f32,
        speed: f32,
        layout: &PoseLayout,
        scratch: &mut CrossFadeScratch,
        out: &mut Pose,
    ) {
        let base = match self.blend_mode {
            LayerBlendMode::Override => PoseBase::Rest,
            LayerBlendMode::Additive => PoseBase::Identity,
        };
        let clip_dt = dt * speed;
        let fade_dt = dt * speed.abs();

        if std::mem::take(&mut self.capture_pending) {
            self.capture_fixed_source(layout, base, out);
        }

        let resolved = match &mut self.phase {
            LayerPhase::Standby => {
                out.reset(layout, base);
                false
            }
            LayerPhase::Playing { current } => {
                advance(&self.machine, current, clip_dt);
                out.reset(layout, base);
                sample_into(&self.machine, &self.bindings, current, out);
                false
            }
            LayerPhase::FixedCrossFading(fade) => {
                advance(&self.machine, &mut fade.source, clip_dt);
                advance(&self.machine, &mut fade.dest, clip_dt);
                fade.elapsed = (fade.elapsed + fade_dt).min(fade.duration);
                let t = fade.ratio();

                scratch.dest.reset(layout, base);
                sample_into(&self.machine, &self.bindings, &mut fade.dest, &mut scratch.dest);
                out.blend(&self.fixed_source, &scratch.dest, t);

                t >= 1.0
            }
            LayerPhase::CrossFading(fade) => {
                advance(&self.machine, &mut fade.source, clip_dt);
                advance(&self.machine, &mut fade.dest, clip_dt);
                fade.elapsed = (fade.elapsed + fade_dt).min(fade.duration);
                let t = fade.ratio();

                scratch.source.reset(layout, base);
                sample_into(&self.machine, &self.bindings, &mut fade.source, &mut scratch.source);
                scratch.dest.reset(layout, base);
                sample_into(&self.machine, &self.bindings, &mut fade.dest, &mut scratch.dest);
                out.blend(&scratch.source, &scratch.dest, t);

                t >= 1.0
            }
        };

        if resolved {
            self.resolve_cross_fade();
        }
    }

    /// Freezes `previous` as the source of the re-based blend. A layer that
    /// never produced a pose falls back to the old destination's sample.
    fn capture_fixed_source(&mut self, layout: &PoseLayout, base: PoseBase, previous: &Pose) {
        let LayerPhase::FixedCrossFading(fade) = &mut self.phase else {
            return;
        };
        if previous.is_animated() && previous.len() == layout.len() {
            self.fixed_source.copy_from(previous);
        } else {
            self.fixed_source.reset(layout, base);
            sample_into(&self.machine, &self.bindings, &mut fade.source, &mut self.fixed_source);
        }
    }

    fn resolve_cross_fade(&mut self) {
        self.phase = match std::mem::take(&mut self.phase) {
            LayerPhase::CrossFading(fade) | LayerPhase::FixedCrossFading(fade) => {
                log::debug!(
                    "Layer '{}': crossfade into {:?} complete",
                    self.name,
                    self.machine.state(fade.dest.state).map(AnimatorState::name)
                );
                LayerPhase::Playing { current: fade.dest }
            }
            other => other,
        };
    }
}

fn advance(machine: &StateMachine, playback: &mut StatePlayback, clip_dt: f32) {
    if let Some(state) = machine.state(playback.state) {
        playback.advance(state, clip_dt * state.speed);
    }
}

/// Samples every bound track of the playback's state into `pose`.
fn sample_into(
    machine: &StateMachine,
    bindings: &[Vec<TrackBinding>],
    playback: &mut StatePlayback,
    pose: &mut Pose,
) {
    let Some(state) = machine.state(playback.state) else {
        return;
    };
    let Some(bindings) = bindings.get(playback.state.index()) else {
        return;
    };
    let clip = state.clip();
    let time = playback.local_time(state);

    for binding in bindings {
        let (Some(track), Some(cursor)) = (
            clip.tracks.get(binding.track_index),
            playback.cursors.get_mut(binding.track_index),
        ) else {
            continue;
        };

        match (&track.data, binding.path) {
            (TrackData::Vector3(t), TargetPath::Translation) => {
                pose.set_translation(binding.target, t.sample_with_cursor(time, cursor));
            }
            (TrackData::Vector3(t), TargetPath::Scale) => {
                pose.set_scale(binding.target, t.sample_with_cursor(time, cursor));
            }
            (TrackData::Quaternion(t), TargetPath::Rotation) => {
                pose.set_rotation(binding.target, t.sample_with_cursor(time, cursor));
            }
            (TrackData::MorphWeights(t), TargetPath::Weights) => {
                pose.set_weights(binding.target, &t.sample_with_cursor(time, cursor));
            }
            (TrackData::Scalar(t), TargetPath::Weight(index)) => {
                pose.set_weight(
                    binding.target,
                    usize::from(index),
                    t.sample_with_cursor(time, cursor),
                );
            }
            _ => {}
        }
    }
}
