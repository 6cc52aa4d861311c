//! Animator Controllers
//!
//! A controller is the authored, shareable description of an animator: an
//! ordered list of layers, each with its own [`StateMachine`], blend mode,
//! default weight and optional target mask. Any number of animators can be
//! instantiated from one `Arc<AnimatorController>`; they share the clips and
//! states read-only and own only their runtime layer state.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::pose::PoseLayout;
use crate::animation::state_machine::StateMachine;

/// How a layer's pose is combined with the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerBlendMode {
    /// Replace lower layers (blended by the layer weight).
    #[default]
    Override,
    /// Add the layer's pose as a weighted delta on top of lower layers.
    Additive,
}

/// Restricts a layer to a subset of targets, optionally with per-target
/// weights. Targets that are not listed are left to the layers below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetMask {
    weights: FxHashMap<String, f32>,
}

impl TargetMask {
    /// Mask with full weight on each listed target.
    #[must_use]
    pub fn new(targets: &[&str]) -> Self {
        Self {
            weights: targets.iter().map(|t| ((*t).to_owned(), 1.0)).collect(),
        }
    }

    /// Mask with explicit per-target weights (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_weights(targets: &[(&str, f32)]) -> Self {
        Self {
            weights: targets
                .iter()
                .map(|(t, w)| ((*t).to_owned(), w.clamp(0.0, 1.0)))
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.weights.contains_key(target)
    }

    #[must_use]
    pub fn weight(&self, target: &str) -> f32 {
        self.weights.get(target).copied().unwrap_or(0.0)
    }

    /// Per-target weights indexed by the layout's [`TargetId`](crate::animation::TargetId)s.
    #[must_use]
    pub fn resolve(&self, layout: &PoseLayout) -> Vec<f32> {
        for name in self.weights.keys() {
            if layout.find(name).is_none() {
                log::debug!("Target mask entry '{name}' matches no animated target");
            }
        }
        layout.iter().map(|(_, name)| self.weight(name)).collect()
    }
}

/// One authored layer.
#[derive(Debug, Clone)]
pub struct LayerDefinition {
    pub name: String,
    pub state_machine: Arc<StateMachine>,
    pub blend_mode: LayerBlendMode,
    /// Initial layer weight, clamped to `[0, 1]` at instantiation.
    pub weight: f32,
    /// State entered when an animator is created; `None` starts in standby.
    pub default_state: Option<String>,
    pub mask: Option<TargetMask>,
}

impl LayerDefinition {
    pub fn new(name: impl Into<String>, state_machine: Arc<StateMachine>) -> Self {
        Self {
            name: name.into(),
            state_machine,
            blend_mode: LayerBlendMode::Override,
            weight: 1.0,
            default_state: None,
            mask: None,
        }
    }

    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: LayerBlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    #[must_use]
    pub fn additive(self) -> Self {
        self.with_blend_mode(LayerBlendMode::Additive)
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_default_state(mut self, state: impl Into<String>) -> Self {
        self.default_state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_mask(mut self, mask: TargetMask) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// Ordered layers; index is composition order, layer 0 is the base.
#[derive(Debug, Clone, Default)]
pub struct AnimatorController {
    pub layers: Vec<LayerDefinition>,
}

impl AnimatorController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_layer(mut self, layer: LayerDefinition) -> Self {
        self.layers.push(layer);
        self
    }

    /// Single-layer controller over one state machine.
    #[must_use]
    pub fn single(state_machine: Arc<StateMachine>) -> Self {
        Self::new().with_layer(LayerDefinition::new("Base", state_machine))
    }

    #[must_use]
    pub fn find_layer(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }
}
