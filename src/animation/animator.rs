//! Animator
//!
//! The [`Animator`] is the per-entity root of the runtime. It owns one
//! [`LayerRuntime`] per controller layer, the scratch poses used to evaluate
//! them, and the public API game code drives:
//!
//! - [`play`](Animator::play) / [`play_in_layer`](Animator::play_in_layer)
//! - [`cross_fade`](Animator::cross_fade) / [`cross_fade_in_layer`](Animator::cross_fade_in_layer)
//! - [`update`](Animator::update), normally called once per tick by the engine
//!
//! Requests mutate layer state directly and take effect the next time
//! `update` runs. `update` evaluates layers in index order, composites their
//! poses (layer 0 is the base, later layers override or add on top) and pushes
//! the result to a [`PoseSink`].

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::animation::binder::Binder;
use crate::animation::clip::{AnimationClip, ClipFault};
use crate::animation::controller::{AnimatorController, LayerBlendMode};
use crate::animation::layer::{CrossFadeOutcome, CrossFadeScratch, LayerRuntime};
use crate::animation::pose::{ChannelMask, LocalTransform, Pose, PoseBase, PoseLayout};
use crate::animation::settings::{AnimatorSettings, CullingMode};
use crate::animation::state::{AnimatorState, StateId};
use crate::animation::target::{NullSink, PoseSink, VisibilityQuery};
use crate::errors::{AnimationError, Result};

/// Snapshot of the state a layer is currently sampling as "current".
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorStateInfo {
    pub state: StateId,
    pub name: String,
    /// Folded playback time in seconds.
    pub time: f32,
    /// Sampled clip-local time over `length`, in `[0, 1]` for every wrap mode;
    /// `0` for zero-length clips.
    pub normalized_time: f32,
    pub length: f32,
    /// `state.speed × animator.speed`.
    pub speed: f32,
    pub finished: bool,
    pub in_transition: bool,
}

pub struct Animator {
    controller: Arc<AnimatorController>,
    layout: PoseLayout,
    layers: Vec<LayerRuntime>,

    // Per-frame scratch, sized to the layout once and reused
    layer_poses: Vec<Pose>,
    scratch: CrossFadeScratch,
    composite: Pose,

    faults: Vec<ClipFault>,
    /// Layer used by the last call that resolved a state.
    last_layer: Option<usize>,

    pub speed: f32,
    pub culling_mode: CullingMode,
    pub enabled: bool,
}

impl Animator {
    pub fn new(controller: Arc<AnimatorController>) -> Result<Self> {
        Self::with_settings(controller, AnimatorSettings::default())
    }

    /// Instantiates `controller`: binds every state's clip into a shared pose
    /// layout, reports clip faults once, and enters each layer's default state.
    pub fn with_settings(
        controller: Arc<AnimatorController>,
        settings: AnimatorSettings,
    ) -> Result<Self> {
        if controller.layers.is_empty() {
            return Err(AnimationError::InvalidController(
                "controller has no layers".to_owned(),
            ));
        }

        let mut layout = PoseLayout::new();
        let mut faults = Vec::new();
        let mut validated: FxHashSet<*const AnimationClip> = FxHashSet::default();
        let mut layer_bindings = Vec::with_capacity(controller.layers.len());

        for def in &controller.layers {
            let mut per_state = Vec::with_capacity(def.state_machine.len());
            for state in def.state_machine.iter() {
                let clip = state.clip();
                if validated.insert(Arc::as_ptr(clip)) {
                    faults.extend(clip.validate());
                }
                if state.is_looping() && clip.duration <= 0.0 {
                    faults.push(ClipFault::ZeroDurationLoop {
                        clip: clip.name.clone(),
                        state: state.name().to_owned(),
                    });
                }
                per_state.push(Binder::bind(&mut layout, clip));
            }
            layer_bindings.push(per_state);
        }

        for fault in &faults {
            log::warn!("Animation data fault: {fault}");
        }

        let mut layers = Vec::with_capacity(controller.layers.len());
        for (def, bindings) in controller.layers.iter().zip(layer_bindings) {
            let mut layer = LayerRuntime::new(def, bindings, &layout);
            if let Some(name) = &def.default_state {
                let id = def.state_machine.find(name).ok_or_else(|| {
                    AnimationError::InvalidController(format!(
                        "layer '{}': default state '{name}' not found",
                        def.name
                    ))
                })?;
                layer.play(id, 0.0);
            }
            layers.push(layer);
        }

        let layer_poses = vec![Pose::with_layout(&layout); layers.len()];
        let scratch = CrossFadeScratch {
            source: Pose::with_layout(&layout),
            dest: Pose::with_layout(&layout),
        };
        let composite = Pose::with_layout(&layout);

        log::debug!(
            "Animator created: {} layer(s), {} target(s), {} fault(s)",
            layers.len(),
            layout.len(),
            faults.len()
        );

        Ok(Self {
            controller,
            layout,
            layers,
            layer_poses,
            scratch,
            composite,
            faults,
            last_layer: None,
            speed: settings.speed,
            culling_mode: settings.culling_mode,
            enabled: settings.enabled,
        })
    }

    // ========================================================================
    // Playback requests
    // ========================================================================

    /// Plays `name` from its start on the last used layer (or the first layer
    /// that has it).
    pub fn play(&mut self, name: &str) -> Result<()> {
        self.play_impl(name, None, 0.0)
    }

    /// Plays `name` on `layer` starting at `normalized_time × duration`,
    /// discarding any crossfade in progress on that layer.
    pub fn play_in_layer(&mut self, name: &str, layer: usize, normalized_time: f32) -> Result<()> {
        self.play_impl(name, Some(layer), normalized_time)
    }

    /// Crossfades into `name` over `duration` seconds on the last used layer
    /// (or the first layer that has it).
    pub fn cross_fade(&mut self, name: &str, duration: f32) -> Result<()> {
        self.cross_fade_impl(name, duration, None)
    }

    /// Crossfades into `name` over `duration` seconds on `layer`.
    pub fn cross_fade_in_layer(&mut self, name: &str, duration: f32, layer: usize) -> Result<()> {
        self.cross_fade_impl(name, duration, Some(layer))
    }

    fn play_impl(&mut self, name: &str, layer: Option<usize>, normalized_time: f32) -> Result<()> {
        let (index, id) = self.resolve(name, layer)?;
        self.layers[index].play(id, normalized_time);
        log::debug!("Layer {index}: play '{name}' at {normalized_time}");
        Ok(())
    }

    fn cross_fade_impl(&mut self, name: &str, duration: f32, layer: Option<usize>) -> Result<()> {
        let (index, id) = self.resolve(name, layer)?;
        let outcome = self.layers[index].cross_fade(id, duration);
        match outcome {
            CrossFadeOutcome::Fixed => log::debug!(
                "Layer {index}: overlapping crossfade into '{name}', duration locked to {:?}",
                self.layers[index].cross_fade_duration()
            ),
            _ => log::debug!("Layer {index}: crossfade into '{name}' over {duration}s: {outcome:?}"),
        }
        Ok(())
    }

    /// Finds the layer and state for a request.
    ///
    /// With an explicit layer only that layer is searched. Otherwise the last
    /// used layer (layer 0 initially) is tried first, then every layer in
    /// order. A hit is cached as the new last used layer.
    fn resolve(&mut self, name: &str, layer: Option<usize>) -> Result<(usize, StateId)> {
        let found = match layer {
            Some(index) => {
                let runtime = self.layer_checked(index)?;
                runtime.state_machine().find(name).map(|id| (index, id))
            }
            None => {
                let preferred = self.last_layer.unwrap_or(0);
                self.layers
                    .get(preferred)
                    .and_then(|l| l.state_machine().find(name))
                    .map(|id| (preferred, id))
                    .or_else(|| {
                        self.layers.iter().enumerate().find_map(|(i, l)| {
                            l.state_machine().find(name).map(|id| (i, id))
                        })
                    })
            }
        };

        match found {
            Some((index, id)) => {
                self.last_layer = Some(index);
                Ok((index, id))
            }
            None => {
                log::debug!("Animator state '{name}' not found (layer: {layer:?})");
                Err(AnimationError::StateNotFound {
                    name: name.to_owned(),
                    layer,
                })
            }
        }
    }

    fn layer_checked(&self, index: usize) -> Result<&LayerRuntime> {
        self.layers.get(index).ok_or(AnimationError::LayerOutOfRange {
            index,
            count: self.layers.len(),
        })
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances every layer by `delta_time` seconds, composites and pushes the
    /// result to `sink`.
    ///
    /// Does nothing while disabled. With [`CullingMode::CullCompletely`] the
    /// body is skipped (the pose freezes) while `visibility` reports nothing
    /// visible.
    pub fn update(
        &mut self,
        delta_time: f32,
        sink: &mut dyn PoseSink,
        visibility: &dyn VisibilityQuery,
    ) {
        if !self.enabled {
            return;
        }
        if self.culling_mode == CullingMode::CullCompletely && !visibility.is_visible() {
            log::trace!("Animator culled: not visible");
            return;
        }

        let delta_time = if delta_time.is_finite() { delta_time } else { 0.0 };
        self.evaluate(delta_time);
        self.push(sink);
    }

    /// [`update`](Self::update) without an output target, always visible.
    pub fn tick(&mut self, delta_time: f32) {
        self.update(delta_time, &mut NullSink, &true);
    }

    fn evaluate(&mut self, delta_time: f32) {
        for (layer, pose) in self.layers.iter_mut().zip(&mut self.layer_poses) {
            layer.evaluate(delta_time, self.speed, &self.layout, &mut self.scratch, pose);
        }

        self.composite.reset(&self.layout, PoseBase::Rest);
        for (layer, pose) in self.layers.iter().zip(&self.layer_poses) {
            match layer.blend_mode() {
                LayerBlendMode::Override => {
                    self.composite
                        .override_with(pose, layer.weight(), layer.mask());
                }
                LayerBlendMode::Additive => {
                    self.composite
                        .add_weighted(pose, layer.weight(), layer.mask());
                }
            }
        }
    }

    fn push(&self, sink: &mut dyn PoseSink) {
        let transform_channels = ChannelMask::TRANSLATION | ChannelMask::ROTATION | ChannelMask::SCALE;

        for (id, transform, channels) in self.composite.animated() {
            if channels.intersects(transform_channels) {
                sink.set_pose(id, transform);
            }
            if channels.contains(ChannelMask::WEIGHTS) {
                for (index, &weight) in self.composite.weights(id).unwrap_or_default().iter().enumerate() {
                    sink.set_blend_shape_weight(id, index, weight);
                }
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The state `layer` samples as "current" (the source during a crossfade).
    pub fn current_animator_state(&self, layer: usize) -> Result<Option<&AnimatorState>> {
        Ok(self.layer_checked(layer)?.current_state())
    }

    pub fn current_animator_state_info(&self, layer: usize) -> Result<Option<AnimatorStateInfo>> {
        let runtime = self.layer_checked(layer)?;
        let (Some(playback), Some(state)) = (runtime.current_playback(), runtime.current_state())
        else {
            return Ok(None);
        };

        let length = state.duration();
        let normalized_time = if length > 0.0 {
            playback.local_time(state) / length
        } else {
            0.0
        };

        Ok(Some(AnimatorStateInfo {
            state: state.id(),
            name: state.name().to_owned(),
            time: playback.time(),
            normalized_time,
            length,
            speed: state.speed * self.speed,
            finished: playback.is_finished(),
            in_transition: runtime.is_in_transition(),
        }))
    }

    /// Looks `name` up in `layer`'s state set; the state need not be playing.
    pub fn find_animator_state(&self, name: &str, layer: usize) -> Result<Option<&AnimatorState>> {
        Ok(self.layer_checked(layer)?.state_machine().find_state(name))
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&LayerRuntime> {
        self.layers.get(index)
    }

    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[LayerRuntime] {
        &self.layers
    }

    pub fn layer_weight(&self, layer: usize) -> Result<f32> {
        Ok(self.layer_checked(layer)?.weight())
    }

    /// Sets a layer's blend weight, clamped to `[0, 1]`.
    pub fn set_layer_weight(&mut self, layer: usize, weight: f32) -> Result<()> {
        let count = self.layers.len();
        self.layers
            .get_mut(layer)
            .ok_or(AnimationError::LayerOutOfRange {
                index: layer,
                count,
            })?
            .set_weight(weight);
        Ok(())
    }

    /// The layer used by the most recent successful request, if any.
    #[inline]
    #[must_use]
    pub fn last_layer(&self) -> Option<usize> {
        self.last_layer
    }

    /// Pose produced by `layer` in the last evaluated frame, before
    /// compositing.
    #[inline]
    #[must_use]
    pub fn layer_pose(&self, layer: usize) -> Option<&Pose> {
        self.layer_poses.get(layer)
    }

    /// Composited pose of the last evaluated frame.
    #[inline]
    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.composite
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &PoseLayout {
        &self.layout
    }

    /// Sets the rest transform used for channels no layer writes. Returns
    /// `false` if no clip animates `target`.
    pub fn set_rest_pose(&mut self, target: &str, transform: LocalTransform) -> bool {
        match self.layout.find(target) {
            Some(id) => self.layout.set_rest(id, transform),
            None => false,
        }
    }

    /// Data faults found in this animator's clips when it was built.
    #[inline]
    #[must_use]
    pub fn faults(&self) -> &[ClipFault] {
        &self.faults
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &Arc<AnimatorController> {
        &self.controller
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("layers", &self.layers)
            .field("targets", &self.layout.len())
            .field("last_layer", &self.last_layer)
            .field("speed", &self.speed)
            .field("culling_mode", &self.culling_mode)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
